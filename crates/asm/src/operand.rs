//! Instruction operands: registers, immediates, memory references and label
//! references.

use core::fmt;

use crate::error::{AsmError, AsmResult};
use crate::mode::Mode;
use crate::reg::{Reg, RegClass, Width, FS, GS};

/// The scaling factor applied to the index register of a memory reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    /// No scaling.
    One,
    /// Index times two.
    Two,
    /// Index times four.
    Four,
    /// Index times eight.
    Eight,
}

impl Scale {
    /// The two-bit hardware encoding (log2 of the factor).
    pub fn enc(self) -> u8 {
        match self {
            Scale::One => 0b00,
            Scale::Two => 0b01,
            Scale::Four => 0b10,
            Scale::Eight => 0b11,
        }
    }

    /// The multiplication factor itself.
    pub fn value(self) -> u8 {
        1 << self.enc()
    }
}

/// A segment override carried by a memory reference.
///
/// Only `fs` and `gs` have an effect in 64-bit mode; the four legacy segments
/// are accepted in 32-bit mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegOverride(Reg);

impl SegOverride {
    /// The prefix byte selecting this segment.
    pub fn prefix_byte(self) -> u8 {
        match self.0.enc() {
            0 => 0x26, // es
            1 => 0x2E, // cs
            2 => 0x36, // ss
            3 => 0x3E, // ds
            4 => 0x64, // fs
            5 => 0x65, // gs
            _ => unreachable!("not a segment register"),
        }
    }

    /// The segment register.
    pub fn reg(self) -> Reg {
        self.0
    }
}

/// A memory reference: `[base + index*scale + disp]` plus the width of the
/// operand stored there (the `dword ptr` part of the Intel syntax) and an
/// optional segment override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mem {
    base: Option<Reg>,
    index: Option<Reg>,
    scale: Scale,
    disp: i32,
    width: Option<Width>,
    segment: Option<SegOverride>,
}

impl Mem {
    /// An absolute reference with neither base nor index.
    pub fn absolute(disp: i32) -> Self {
        Self {
            base: None,
            index: None,
            scale: Scale::One,
            disp,
            width: None,
            segment: None,
        }
    }

    /// A reference based at `base`.
    pub fn base(base: Reg) -> Self {
        Self {
            base: Some(base),
            ..Self::absolute(0)
        }
    }

    /// Add an index register with a scale.
    pub fn index(mut self, index: Reg, scale: Scale) -> Self {
        self.index = Some(index);
        self.scale = scale;
        self
    }

    /// Add a displacement.
    pub fn disp(mut self, disp: i32) -> Self {
        self.disp = disp;
        self
    }

    /// Tag the reference with the width of the operand at that address; this
    /// is the `byte/word/dword/qword ptr` sizer.
    pub fn width(mut self, width: Width) -> Self {
        self.width = Some(width);
        self
    }

    /// Add a segment override.
    pub fn segment(mut self, seg: Reg) -> Self {
        debug_assert_eq!(seg.class(), RegClass::Segment);
        self.segment = Some(SegOverride(seg));
        self
    }

    /// The base register, if any.
    pub fn base_reg(&self) -> Option<Reg> {
        self.base
    }

    /// The index register, if any.
    pub fn index_reg(&self) -> Option<Reg> {
        self.index
    }

    /// The scale; meaningful only when an index is present.
    pub fn scale_factor(&self) -> Scale {
        self.scale
    }

    /// The 32-bit signed displacement.
    pub fn disp_value(&self) -> i32 {
        self.disp
    }

    /// The operand width, if the reference has been sized.
    pub fn operand_width(&self) -> Option<Width> {
        self.width
    }

    /// The segment override, if any.
    pub fn seg_override(&self) -> Option<SegOverride> {
        self.segment
    }

    /// The width of the address registers, defaulting to the mode's address
    /// width for bare `[disp]` references.
    pub fn address_width(&self, mode: Mode) -> Width {
        self.base
            .or(self.index)
            .map(|r| r.width())
            .unwrap_or_else(|| mode.address_width())
    }

    /// Check the structural invariants of this reference under `mode`.
    pub fn validate(&self, mode: Mode) -> AsmResult<()> {
        for reg in [self.base, self.index].into_iter().flatten() {
            if reg.class() != RegClass::Gpr {
                return Err(AsmError::ArchMismatch {
                    what: format!("{reg} as an address register"),
                    mode,
                });
            }
            match reg.width() {
                Width::Word => return Err(AsmError::Unsupported16BitAddressing),
                Width::Dword => {}
                Width::Qword if mode.is_64() => {}
                _ => {
                    return Err(AsmError::ArchMismatch {
                        what: format!("{reg} as an address register"),
                        mode,
                    })
                }
            }
            if reg.long_mode_only() && !mode.is_64() {
                return Err(AsmError::ArchMismatch {
                    what: reg.name().to_string(),
                    mode,
                });
            }
        }
        if let (Some(base), Some(index)) = (self.base, self.index) {
            if base.width() != index.width() {
                return Err(AsmError::ArchMismatch {
                    what: format!("mixed address widths {base} and {index}"),
                    mode,
                });
            }
        }
        if let Some(index) = self.index {
            // rsp/esp can never be an index; r12 (same low bits) is fine.
            if index.enc() == 4 {
                return Err(AsmError::OperandMisuse {
                    mnemonic: String::new(),
                    index: 0,
                    reason: format!("{index} cannot be used as an index register"),
                });
            }
        } else if self.scale != Scale::One {
            return Err(AsmError::OperandMisuse {
                mnemonic: String::new(),
                index: 0,
                reason: "scale given without an index register".to_string(),
            });
        }
        if let Some(seg) = self.segment {
            if mode.is_64() && seg.reg() != FS && seg.reg() != GS {
                return Err(AsmError::ArchMismatch {
                    what: format!("{} segment override", seg.reg()),
                    mode,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Mem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(width) = self.width {
            write!(f, "{} ptr ", width.ptr_name())?;
        }
        if let Some(seg) = self.segment {
            write!(f, "{}:", seg.reg())?;
        }
        write!(f, "[")?;
        let mut has_term = false;
        if let Some(base) = self.base {
            write!(f, "{base}")?;
            has_term = true;
        }
        if let Some(index) = self.index {
            if has_term {
                write!(f, " + ")?;
            }
            write!(f, "{index}")?;
            if self.scale != Scale::One {
                write!(f, "*{}", self.scale.value())?;
            }
            has_term = true;
        }
        if self.disp != 0 || !has_term {
            if has_term {
                if self.disp < 0 {
                    write!(f, " - {:#x}", i64::from(self.disp).unsigned_abs())?;
                } else {
                    write!(f, " + {:#x}", self.disp)?;
                }
            } else {
                write!(f, "{:#x}", self.disp)?;
            }
        }
        write!(f, "]")
    }
}

/// Size a memory reference as a byte operand.
pub fn byte_ptr(mem: Mem) -> Mem {
    mem.width(Width::Byte)
}

/// Size a memory reference as a word operand.
pub fn word_ptr(mem: Mem) -> Mem {
    mem.width(Width::Word)
}

/// Size a memory reference as a doubleword operand.
pub fn dword_ptr(mem: Mem) -> Mem {
    mem.width(Width::Dword)
}

/// Size a memory reference as a quadword operand.
pub fn qword_ptr(mem: Mem) -> Mem {
    mem.width(Width::Qword)
}

/// One operand of an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// A register.
    Reg(Reg),
    /// An integer immediate; its encoded width is chosen by row selection.
    Imm(i64),
    /// A memory reference.
    Mem(Mem),
    /// A named label, used either as a branch target (relative displacement)
    /// or as an absolute address immediate patched at load time.
    Label(String),
}

impl Operand {
    /// A label operand.
    pub fn label(name: impl Into<String>) -> Self {
        Operand::Label(name.into())
    }

    /// The register, if this operand is one.
    pub fn as_reg(&self) -> Option<Reg> {
        match self {
            Operand::Reg(r) => Some(*r),
            _ => None,
        }
    }

    /// The memory reference, if this operand is one.
    pub fn as_mem(&self) -> Option<&Mem> {
        match self {
            Operand::Mem(m) => Some(m),
            _ => None,
        }
    }
}

impl From<Reg> for Operand {
    fn from(r: Reg) -> Self {
        Operand::Reg(r)
    }
}

impl From<Mem> for Operand {
    fn from(m: Mem) -> Self {
        Operand::Mem(m)
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Imm(v)
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Imm(v.into())
    }
}

impl From<u32> for Operand {
    fn from(v: u32) -> Self {
        Operand::Imm(v.into())
    }
}

impl From<u8> for Operand {
    fn from(v: u8) -> Self {
        Operand::Imm(v.into())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Imm(v) => {
                if (0..10).contains(v) {
                    write!(f, "{v}")
                } else if *v < 0 {
                    write!(f, "-{:#x}", v.unsigned_abs())
                } else {
                    write!(f, "{v:#x}")
                }
            }
            Operand::Mem(m) => write!(f, "{m}"),
            Operand::Label(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::{EBP, ECX, EDX, ESP, R12, RAX, RCX, RSP};

    #[test]
    fn builder_and_display() {
        let m = Mem::base(RAX).index(RCX, Scale::Eight).disp(12).width(Width::Dword);
        assert_eq!(m.to_string(), "dword ptr [rax + rcx*8 + 0xc]");
        assert_eq!(Mem::absolute(16).to_string(), "[0x10]");
    }

    #[test]
    fn esp_rejected_as_index() {
        let m = Mem::base(EDX).index(ESP, Scale::Two);
        assert!(m.validate(Mode::Protected32).is_err());
        let m = Mem::base(RAX).index(RSP, Scale::Two);
        assert!(m.validate(Mode::Long64).is_err());
        // r12 shares rsp's low bits but is a legal index.
        let m = Mem::base(RAX).index(R12, Scale::Two);
        assert!(m.validate(Mode::Long64).is_ok());
    }

    #[test]
    fn mode_agreement() {
        let m = Mem::base(RAX);
        assert!(m.validate(Mode::Long64).is_ok());
        assert!(m.validate(Mode::Protected32).is_err());

        let m = Mem::base(EBP).index(ECX, Scale::Four);
        assert!(m.validate(Mode::Protected32).is_ok());
        assert!(m.validate(Mode::Long64).is_ok()); // 0x67 override

        let m = Mem::base(RAX).index(ECX, Scale::One);
        assert!(m.validate(Mode::Long64).is_err());
    }

    #[test]
    fn scale_without_index() {
        let mut m = Mem::base(RAX);
        m.scale = Scale::Four;
        assert!(m.validate(Mode::Long64).is_err());
    }
}

//! Encoding primitives: REX, ModR/M, SIB, displacements and immediates.
//!
//! These are pure byte producers. Which fields an instruction carries, and
//! with which values, is decided by the spec table and the instruction
//! object; this module only knows how to pack bits and emit little-endian
//! fields.

use crate::reg::Width;
use crate::sink::CodeSink;

/// Legacy prefix bytes.
pub mod prefix {
    /// Operand-size override.
    pub const OPERAND_SIZE: u8 = 0x66;
    /// Address-size override.
    pub const ADDRESS_SIZE: u8 = 0x67;
    /// `fs` segment override.
    pub const SEG_FS: u8 = 0x64;
    /// `gs` segment override.
    pub const SEG_GS: u8 = 0x65;
    /// Bus lock.
    pub const LOCK: u8 = 0xF0;
}

/// Encode the ModR/M byte.
#[inline]
pub fn encode_modrm(m0d: u8, reg_g: u8, rm_e: u8) -> u8 {
    debug_assert!(m0d < 4);
    debug_assert!(reg_g < 8);
    debug_assert!(rm_e < 8);
    (m0d << 6) | (reg_g << 3) | rm_e
}

/// Encode the SIB byte (scale-index-base).
#[inline]
pub fn encode_sib(scale: u8, index: u8, base: u8) -> u8 {
    debug_assert!(scale < 4);
    debug_assert!(index < 8);
    debug_assert!(base < 8);
    (scale << 6) | (index << 3) | base
}

/// An accumulator for the REX prefix bits.
///
/// The prefix is emitted only when one of W/R/X/B is set or when a byte
/// register in `spl`/`bpl`/`sil`/`dil` forces an all-zero REX. REX bytes only
/// exist in 64-bit mode; callers must not construct one for a 32-bit unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct RexFlags {
    w: bool,
    r: bool,
    x: bool,
    b: bool,
    always_emit: bool,
}

impl RexFlags {
    /// Flags with no bits set.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags with REX.W set (64-bit operand size).
    #[inline]
    pub fn with_w() -> Self {
        Self {
            w: true,
            ..Self::default()
        }
    }

    /// Set REX.R from the register going into the ModR/M reg field.
    #[inline]
    pub fn set_reg(&mut self, enc: u8) -> &mut Self {
        self.r = enc >> 3 != 0;
        self
    }

    /// Set REX.X from the register going into the SIB index field.
    #[inline]
    pub fn set_index(&mut self, enc: u8) -> &mut Self {
        self.x = enc >> 3 != 0;
        self
    }

    /// Set REX.B from the register going into the ModR/M r/m field, the SIB
    /// base field, or the opcode's low three bits.
    #[inline]
    pub fn set_base(&mut self, enc: u8) -> &mut Self {
        self.b = enc >> 3 != 0;
        self
    }

    /// Force emission even when all bits are clear; required to reach
    /// `spl`/`bpl`/`sil`/`dil`.
    #[inline]
    pub fn always_emit(&mut self) -> &mut Self {
        self.always_emit = true;
        self
    }

    /// Whether a REX byte will be produced at all.
    #[inline]
    pub fn must_emit(&self) -> bool {
        self.w || self.r || self.x || self.b || self.always_emit
    }

    /// Emit the prefix if any of its reasons to exist hold.
    pub fn emit(&self, sink: &mut impl CodeSink) {
        if self.must_emit() {
            sink.put1(
                0x40 | (u8::from(self.w) << 3)
                    | (u8::from(self.r) << 2)
                    | (u8::from(self.x) << 1)
                    | u8::from(self.b),
            );
        }
    }
}

/// A classified memory displacement: absent, 8-bit, or 32-bit.
///
/// The classification picks the shortest form; `force_disp8` upgrades an
/// absent displacement for the base registers whose ModR/M slot is reused as
/// a marker (`rbp`/`r13`/`ebp` with mod=00).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disp {
    /// No displacement bytes (mod=00).
    None,
    /// A sign-extended 8-bit displacement (mod=01).
    D8(i8),
    /// A full 32-bit displacement (mod=10).
    D32(i32),
}

impl Disp {
    /// Classify `value` as the shortest displacement that represents it.
    pub fn new(value: i32) -> Self {
        if value == 0 {
            Disp::None
        } else {
            match i8::try_from(value) {
                Ok(v) => Disp::D8(v),
                Err(_) => Disp::D32(value),
            }
        }
    }

    /// Turn `None` into an explicit zero byte; the encoding for `rbp`-like
    /// bases has no displacement-free form.
    pub fn force_disp8(&mut self) {
        if let Disp::None = self {
            *self = Disp::D8(0);
        }
    }

    /// The two mod bits this displacement selects.
    pub fn m0d(self) -> u8 {
        match self {
            Disp::None => 0b00,
            Disp::D8(_) => 0b01,
            Disp::D32(_) => 0b10,
        }
    }

    /// The number of displacement bytes.
    pub fn len(self) -> u32 {
        match self {
            Disp::None => 0,
            Disp::D8(_) => 1,
            Disp::D32(_) => 4,
        }
    }

    /// Emit the displacement bytes, little-endian.
    pub fn emit(self, sink: &mut impl CodeSink) {
        match self {
            Disp::None => {}
            Disp::D8(v) => sink.put1(v as u8),
            Disp::D32(v) => sink.put4(v as u32),
        }
    }
}

/// Emit an immediate of the given width, little-endian.
///
/// The range check happened during row selection; this truncates to the
/// selected width, which at this point is value-preserving under the row's
/// sign convention.
pub fn emit_imm(sink: &mut impl CodeSink, width: Width, value: i64) {
    match width {
        Width::Byte => sink.put1(value as u8),
        Width::Word => sink.put2(value as u16),
        Width::Dword => sink.put4(value as u32),
        Width::Qword => sink.put8(value as u64),
        Width::Tword | Width::Oword => unreachable!("no immediate of width {width:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modrm_packing() {
        assert_eq!(encode_modrm(0b11, 0, 0), 0xC0);
        assert_eq!(encode_modrm(0b01, 0b000, 0b100), 0x44);
        assert_eq!(encode_sib(0b11, 0b001, 0b010), 0xCA);
    }

    #[test]
    fn rex_emission() {
        let mut sink = Vec::new();
        RexFlags::new().emit(&mut sink);
        assert!(sink.is_empty(), "no reason to emit => no byte");

        RexFlags::with_w().emit(&mut sink);
        assert_eq!(sink, vec![0x48]);

        sink.clear();
        let mut rex = RexFlags::new();
        rex.set_reg(9).set_base(1);
        rex.emit(&mut sink);
        assert_eq!(sink, vec![0x44]);

        sink.clear();
        let mut rex = RexFlags::new();
        rex.always_emit();
        rex.emit(&mut sink);
        assert_eq!(sink, vec![0x40]);
    }

    #[test]
    fn disp_classification() {
        assert_eq!(Disp::new(0), Disp::None);
        assert_eq!(Disp::new(-1), Disp::D8(-1));
        assert_eq!(Disp::new(127), Disp::D8(127));
        assert_eq!(Disp::new(128), Disp::D32(128));
        let mut d = Disp::new(0);
        d.force_disp8();
        assert_eq!(d, Disp::D8(0));
    }
}

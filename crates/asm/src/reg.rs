//! The register catalog.
//!
//! Every named register is a process-wide constant carrying its class, width,
//! hardware encoding index and the two flags that drive prefix decisions: the
//! `long_mode_only` registers do not exist in 32-bit mode, and the
//! `high_byte` aliases (`ah`, `bh`, `ch`, `dh`) are mutually exclusive with a
//! REX prefix. Registers of different widths that name the same hardware
//! register (`al`/`ax`/`eax`/`rax`) share an encoding index.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The hardware class a register belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegClass {
    /// General purpose registers.
    Gpr,
    /// Segment registers.
    Segment,
    /// x87 floating point stack.
    St,
    /// MMX registers.
    Mmx,
    /// SSE registers.
    Xmm,
}

/// An access width, for registers and for memory operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Width {
    /// 8 bits.
    Byte,
    /// 16 bits.
    Word,
    /// 32 bits.
    Dword,
    /// 64 bits.
    Qword,
    /// 80 bits (x87).
    Tword,
    /// 128 bits (SSE).
    Oword,
}

impl Width {
    /// Width in bits.
    pub fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
            Width::Dword => 32,
            Width::Qword => 64,
            Width::Tword => 80,
            Width::Oword => 128,
        }
    }

    /// Width in whole bytes.
    pub fn bytes(self) -> u32 {
        self.bits() / 8
    }

    /// The `ptr` keyword naming this width in Intel syntax.
    pub fn ptr_name(self) -> &'static str {
        match self {
            Width::Byte => "byte",
            Width::Word => "word",
            Width::Dword => "dword",
            Width::Qword => "qword",
            Width::Tword => "tword",
            Width::Oword => "xmmword",
        }
    }
}

/// A named register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reg {
    name: &'static str,
    class: RegClass,
    width: Width,
    enc: u8,
    long_mode_only: bool,
    high_byte: bool,
}

impl Reg {
    const fn new(
        name: &'static str,
        class: RegClass,
        width: Width,
        enc: u8,
        long_mode_only: bool,
        high_byte: bool,
    ) -> Self {
        Self {
            name,
            class,
            width,
            enc,
            long_mode_only,
            high_byte,
        }
    }

    const fn gpr(name: &'static str, width: Width, enc: u8, long_mode_only: bool) -> Self {
        Self::new(name, RegClass::Gpr, width, enc, long_mode_only, false)
    }

    const fn high(name: &'static str, enc: u8) -> Self {
        Self::new(name, RegClass::Gpr, Width::Byte, enc, false, true)
    }

    /// The lowercase Intel name.
    pub fn name(self) -> &'static str {
        self.name
    }

    /// The register class.
    pub fn class(self) -> RegClass {
        self.class
    }

    /// The access width.
    pub fn width(self) -> Width {
        self.width
    }

    /// The 4-bit hardware encoding index (0..16). Bit 3 is carried by a REX
    /// extension bit when the register appears in a ModR/M or SIB field.
    pub fn enc(self) -> u8 {
        self.enc
    }

    /// True for registers that only exist in 64-bit mode (`r8`–`r15` in all
    /// widths, the 64-bit registers themselves, and `spl`/`bpl`/`sil`/`dil`).
    pub fn long_mode_only(self) -> bool {
        self.long_mode_only
    }

    /// True for the legacy high-byte aliases `ah`/`bh`/`ch`/`dh`, which
    /// cannot be encoded together with any REX prefix.
    pub fn is_high_byte(self) -> bool {
        self.high_byte
    }

    /// True when the encoding index needs a REX extension bit (r8–r15).
    pub fn is_extended(self) -> bool {
        self.enc >= 8
    }

    /// True for `spl`/`bpl`/`sil`/`dil`: byte registers that are only
    /// reachable with a (possibly all-zero) REX prefix.
    pub fn needs_rex_for_byte(self) -> bool {
        self.class == RegClass::Gpr
            && self.width == Width::Byte
            && !self.high_byte
            && (4..=7).contains(&self.enc)
    }
}

impl core::fmt::Display for Reg {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.name)
    }
}

macro_rules! gpr64 {
    ($($name:ident = ($text:literal, $enc:literal)),+ $(,)?) => {
        $(pub const $name: Reg = Reg::gpr($text, Width::Qword, $enc, true);)+
    };
}

macro_rules! gpr32 {
    ($($name:ident = ($text:literal, $enc:literal, $long:literal)),+ $(,)?) => {
        $(pub const $name: Reg = Reg::gpr($text, Width::Dword, $enc, $long);)+
    };
}

macro_rules! gpr16 {
    ($($name:ident = ($text:literal, $enc:literal, $long:literal)),+ $(,)?) => {
        $(pub const $name: Reg = Reg::gpr($text, Width::Word, $enc, $long);)+
    };
}

macro_rules! gpr8 {
    ($($name:ident = ($text:literal, $enc:literal, $long:literal)),+ $(,)?) => {
        $(pub const $name: Reg = Reg::gpr($text, Width::Byte, $enc, $long);)+
    };
}

gpr64! {
    RAX = ("rax", 0), RCX = ("rcx", 1), RDX = ("rdx", 2), RBX = ("rbx", 3),
    RSP = ("rsp", 4), RBP = ("rbp", 5), RSI = ("rsi", 6), RDI = ("rdi", 7),
    R8 = ("r8", 8), R9 = ("r9", 9), R10 = ("r10", 10), R11 = ("r11", 11),
    R12 = ("r12", 12), R13 = ("r13", 13), R14 = ("r14", 14), R15 = ("r15", 15),
}

gpr32! {
    EAX = ("eax", 0, false), ECX = ("ecx", 1, false), EDX = ("edx", 2, false),
    EBX = ("ebx", 3, false), ESP = ("esp", 4, false), EBP = ("ebp", 5, false),
    ESI = ("esi", 6, false), EDI = ("edi", 7, false),
    R8D = ("r8d", 8, true), R9D = ("r9d", 9, true), R10D = ("r10d", 10, true),
    R11D = ("r11d", 11, true), R12D = ("r12d", 12, true), R13D = ("r13d", 13, true),
    R14D = ("r14d", 14, true), R15D = ("r15d", 15, true),
}

gpr16! {
    AX = ("ax", 0, false), CX = ("cx", 1, false), DX = ("dx", 2, false),
    BX = ("bx", 3, false), SP = ("sp", 4, false), BP = ("bp", 5, false),
    SI = ("si", 6, false), DI = ("di", 7, false),
    R8W = ("r8w", 8, true), R9W = ("r9w", 9, true), R10W = ("r10w", 10, true),
    R11W = ("r11w", 11, true), R12W = ("r12w", 12, true), R13W = ("r13w", 13, true),
    R14W = ("r14w", 14, true), R15W = ("r15w", 15, true),
}

gpr8! {
    AL = ("al", 0, false), CL = ("cl", 1, false), DL = ("dl", 2, false),
    BL = ("bl", 3, false),
    SPL = ("spl", 4, true), BPL = ("bpl", 5, true), SIL = ("sil", 6, true),
    DIL = ("dil", 7, true),
    R8B = ("r8b", 8, true), R9B = ("r9b", 9, true), R10B = ("r10b", 10, true),
    R11B = ("r11b", 11, true), R12B = ("r12b", 12, true), R13B = ("r13b", 13, true),
    R14B = ("r14b", 14, true), R15B = ("r15b", 15, true),
}

pub const AH: Reg = Reg::high("ah", 4);
pub const CH: Reg = Reg::high("ch", 5);
pub const DH: Reg = Reg::high("dh", 6);
pub const BH: Reg = Reg::high("bh", 7);

pub const ES: Reg = Reg::new("es", RegClass::Segment, Width::Word, 0, false, false);
pub const CS: Reg = Reg::new("cs", RegClass::Segment, Width::Word, 1, false, false);
pub const SS: Reg = Reg::new("ss", RegClass::Segment, Width::Word, 2, false, false);
pub const DS: Reg = Reg::new("ds", RegClass::Segment, Width::Word, 3, false, false);
pub const FS: Reg = Reg::new("fs", RegClass::Segment, Width::Word, 4, false, false);
pub const GS: Reg = Reg::new("gs", RegClass::Segment, Width::Word, 5, false, false);

macro_rules! numbered {
    ($class:ident, $width:ident, $prefix:literal, $($name:ident = $enc:literal),+ $(,)?) => {
        $(pub const $name: Reg = Reg::new(
            concat!($prefix, stringify!($enc)),
            RegClass::$class,
            Width::$width,
            $enc,
            false,
            false,
        );)+
    };
}

numbered!(St, Tword, "st", ST0 = 0, ST1 = 1, ST2 = 2, ST3 = 3, ST4 = 4, ST5 = 5, ST6 = 6, ST7 = 7);
numbered!(Mmx, Qword, "mm", MM0 = 0, MM1 = 1, MM2 = 2, MM3 = 3, MM4 = 4, MM5 = 5, MM6 = 6, MM7 = 7);

macro_rules! xmms {
    ($($name:ident = ($enc:literal, $long:literal)),+ $(,)?) => {
        $(pub const $name: Reg = Reg::new(
            concat!("xmm", $enc),
            RegClass::Xmm,
            Width::Oword,
            $enc,
            $long,
            false,
        );)+
    };
}

xmms! {
    XMM0 = (0, false), XMM1 = (1, false), XMM2 = (2, false), XMM3 = (3, false),
    XMM4 = (4, false), XMM5 = (5, false), XMM6 = (6, false), XMM7 = (7, false),
    XMM8 = (8, true), XMM9 = (9, true), XMM10 = (10, true), XMM11 = (11, true),
    XMM12 = (12, true), XMM13 = (13, true), XMM14 = (14, true), XMM15 = (15, true),
}

/// Every register the catalog knows about.
pub const ALL: &[Reg] = &[
    RAX, RCX, RDX, RBX, RSP, RBP, RSI, RDI, R8, R9, R10, R11, R12, R13, R14, R15, //
    EAX, ECX, EDX, EBX, ESP, EBP, ESI, EDI, R8D, R9D, R10D, R11D, R12D, R13D, R14D, R15D, //
    AX, CX, DX, BX, SP, BP, SI, DI, R8W, R9W, R10W, R11W, R12W, R13W, R14W, R15W, //
    AL, CL, DL, BL, SPL, BPL, SIL, DIL, R8B, R9B, R10B, R11B, R12B, R13B, R14B, R15B, //
    AH, CH, DH, BH, //
    ES, CS, SS, DS, FS, GS, //
    ST0, ST1, ST2, ST3, ST4, ST5, ST6, ST7, //
    MM0, MM1, MM2, MM3, MM4, MM5, MM6, MM7, //
    XMM0, XMM1, XMM2, XMM3, XMM4, XMM5, XMM6, XMM7, //
    XMM8, XMM9, XMM10, XMM11, XMM12, XMM13, XMM14, XMM15,
];

static BY_NAME: Lazy<HashMap<&'static str, Reg>> =
    Lazy::new(|| ALL.iter().map(|r| (r.name(), *r)).collect());

/// Look a register up by its lowercase Intel name.
pub fn by_name(name: &str) -> Option<Reg> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(by_name("rax"), Some(RAX));
        assert_eq!(by_name("r13b"), Some(R13B));
        assert_eq!(by_name("xmm15"), Some(XMM15));
        assert_eq!(by_name("st3"), Some(ST3));
        assert_eq!(by_name("zzz"), None);
    }

    #[test]
    fn aliases_share_encodings() {
        assert_eq!(AL.enc(), RAX.enc());
        assert_eq!(AX.enc(), EAX.enc());
        assert_eq!(BH.enc(), 7);
        assert_eq!(DH.enc(), 6);
    }

    #[test]
    fn rex_flags() {
        assert!(SPL.needs_rex_for_byte());
        assert!(DIL.needs_rex_for_byte());
        assert!(!AH.needs_rex_for_byte());
        assert!(AH.is_high_byte());
        assert!(R8.is_extended());
        assert!(!RBP.is_extended());
        assert!(R8D.long_mode_only());
        assert!(!EAX.long_mode_only());
    }
}

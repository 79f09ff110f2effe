//! Architecture mode selection.
//!
//! Every operand validation, row selection and emission decision is
//! parameterized by a [`Mode`]; nothing in this crate consults process-wide
//! state. An [`crate::Unit`] records the mode it was created with and refuses
//! instructions built for the other one.

use core::fmt;
use target_lexicon::{Architecture, Triple};

use crate::reg::Width;

/// The architecture mode an assembly unit is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Intel-64 long mode: 64-bit addresses, 32-bit default operand size.
    Long64,
    /// IA-32 protected mode: 32-bit addresses and operand size.
    Protected32,
}

impl Mode {
    /// True for 64-bit long mode.
    #[inline]
    pub fn is_64(self) -> bool {
        matches!(self, Mode::Long64)
    }

    /// The default operand width when no prefix overrides it.
    ///
    /// Note that this is `Dword` even in long mode; 64-bit operands require
    /// REX.W (or an instruction that defaults to 64-bit operation).
    pub fn operand_width(self) -> Width {
        Width::Dword
    }

    /// The default address width.
    pub fn address_width(self) -> Width {
        match self {
            Mode::Long64 => Width::Qword,
            Mode::Protected32 => Width::Dword,
        }
    }

    /// The width of an absolute code address, as patched into immediates that
    /// reference labels.
    pub fn pointer_width(self) -> Width {
        self.address_width()
    }

    /// Return the mode matching the host, if the host is an x86 of some kind.
    pub fn host() -> Option<Mode> {
        Mode::from_triple(&Triple::host())
    }

    /// Return the mode matching `triple`, if it is an x86 of some kind.
    pub fn from_triple(triple: &Triple) -> Option<Mode> {
        match triple.architecture {
            Architecture::X86_64 => Some(Mode::Long64),
            Architecture::X86_32(_) => Some(Mode::Protected32),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Long64 => write!(f, "64-bit"),
            Mode::Protected32 => write!(f, "32-bit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(Mode::Long64.address_width(), Width::Qword);
        assert_eq!(Mode::Protected32.address_width(), Width::Dword);
        assert_eq!(Mode::Long64.operand_width(), Width::Dword);
    }
}

//! Assembler flags and the context threaded through encoding.

use crate::mode::Mode;

/// Tunable assembler behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct Flags {
    strict_parity: bool,
}

impl Flags {
    /// Create the default flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the shortest-encoding preference during row selection.
    ///
    /// By default, when several encoding rows accept an operand tuple, the
    /// shortest one wins (declaration order breaks ties). With strict parity
    /// enabled, selection is pure declaration order, which pins the choice to
    /// the reference assembler's listing for regression comparison.
    pub fn enable_strict_parity(mut self) -> Self {
        self.strict_parity = true;
        self
    }

    /// Whether strict parity selection is in effect.
    #[inline]
    pub fn strict_parity(self) -> bool {
        self.strict_parity
    }
}

/// Mode and flags, bundled so they travel together through validation, row
/// selection and emission.
#[derive(Clone, Copy, Debug)]
pub struct AsmCtx {
    /// The architecture mode.
    pub mode: Mode,
    /// Assembler flags.
    pub flags: Flags,
}

impl AsmCtx {
    /// A context with default flags.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            flags: Flags::default(),
        }
    }

    /// A context with explicit flags.
    pub fn with_flags(mode: Mode, flags: Flags) -> Self {
        Self { mode, flags }
    }
}

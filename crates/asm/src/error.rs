//! Structured assembler errors.
//!
//! Every failure carries enough context (mnemonic, operand index, offending
//! value) for a front-end to report it without re-deriving state. Resolution
//! fails fast: the first error aborts the current assembly unit.

use thiserror::Error;

use crate::mode::Mode;

/// An error produced while building or resolving an assembly unit.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AsmError {
    /// The mnemonic has no entry in the instruction spec table.
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),

    /// No encoding row accepts the operand tuple. `tried` lists the
    /// signatures that were considered, in declaration order.
    #[error("no form of `{mnemonic}` matches ({given}); tried: {tried}")]
    NoMatchingForm {
        /// The mnemonic being encoded.
        mnemonic: String,
        /// A rendering of the operands that were supplied.
        given: String,
        /// The signatures that were scanned and rejected.
        tried: String,
    },

    /// An operand is illegal in its position, e.g. `ah` combined with a
    /// REX-requiring register, or `rsp` as an index register.
    #[error("operand {index} of `{mnemonic}`: {reason}")]
    OperandMisuse {
        /// The mnemonic being encoded.
        mnemonic: String,
        /// Zero-based operand position.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// An immediate does not fit the width the matching rows require.
    #[error("immediate {value} of `{mnemonic}` operand {index} does not fit {width} bits")]
    ImmediateOutOfRange {
        /// The mnemonic being encoded.
        mnemonic: String,
        /// Zero-based operand position.
        index: usize,
        /// The value that was supplied.
        value: i64,
        /// The widest immediate the scanned rows accept, in bits.
        width: u8,
    },

    /// A memory or branch displacement exceeds its encodable range.
    #[error("displacement {0} exceeds the signed 32-bit range")]
    DisplacementOutOfRange(i64),

    /// A label was referenced but never defined. The reference assembler
    /// silently emits zero here; this assembler rejects.
    #[error("label `{0}` is referenced but never defined")]
    UndefinedLabel(String),

    /// The same label name was defined twice in one unit.
    #[error("label `{0}` is defined more than once")]
    DuplicateLabel(String),

    /// A register or instruction form is not encodable in the current mode.
    #[error("`{what}` is not encodable in {mode} mode")]
    ArchMismatch {
        /// The register name or form that does not exist in `mode`.
        what: String,
        /// The mode of the unit being assembled.
        mode: Mode,
    },

    /// 16-bit address forms are recognized but deliberately unsupported.
    #[error("16-bit address forms are not supported")]
    Unsupported16BitAddressing,
}

impl AsmError {
    pub(crate) fn misuse(mnemonic: &str, index: usize, reason: impl Into<String>) -> Self {
        AsmError::OperandMisuse {
            mnemonic: mnemonic.to_string(),
            index,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type AsmResult<T> = Result<T, AsmError>;

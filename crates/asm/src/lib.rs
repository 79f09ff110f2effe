//! A runtime assembler for IA-32 and Intel-64.
//!
//! The crate turns symbolic instructions into the exact bytes a mainstream
//! system assembler (in Intel-mnemonic mode) would produce. Instructions are
//! bound from a mnemonic plus an operand tuple ([`Inst`]), collected into a
//! [`Unit`] together with label definitions, and resolved in two passes: a
//! sizing pass that shrinks branches to their short forms where the label
//! distance allows it, and an emission pass that patches displacements and
//! records absolute-address relocations.
//!
//! ```
//! use anvil_asm::{Mode, Operand, Unit};
//! use anvil_asm::reg::{RBP, RSP};
//!
//! let mut unit = Unit::new(Mode::Long64);
//! unit.emit("push", &[RBP.into()])?;
//! unit.emit("mov", &[RBP.into(), RSP.into()])?;
//! unit.emit("ret", &[])?;
//! let out = unit.assemble()?;
//! assert_eq!(out.bytes, vec![0x55, 0x48, 0x89, 0xE5, 0xC3]);
//! # Ok::<(), anvil_asm::AsmError>(())
//! ```
//!
//! Divergences from the reference assembler are deliberate and small: an
//! undefined label is an error rather than a silent zero, oversized
//! displacements are errors rather than truncations, and when several
//! encodings are equally legal the shortest is chosen (disable the latter
//! with [`Flags::enable_strict_parity`]).

mod error;
mod inst;
mod insts;
mod mode;
pub mod operand;
pub mod reg;
mod rex;
mod settings;
mod sink;
pub mod table;
mod unit;

pub use error::{AsmError, AsmResult};
pub use inst::Inst;
pub use mode::Mode;
pub use operand::{byte_ptr, dword_ptr, qword_ptr, word_ptr, Mem, Operand, Scale};
pub use reg::{by_name as register_by_name, Reg, RegClass, Width};
pub use rex::{encode_modrm, encode_sib, Disp, RexFlags};
pub use settings::{AsmCtx, Flags};
pub use sink::{CodeOffset, CodeSink};
pub use unit::{AbsReloc, Entry, Output, Unit};

#[cfg(test)]
mod emit_tests;

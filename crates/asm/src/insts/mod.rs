//! The per-family encoding rows, split the way the reference manual groups
//! them. Each file is a data table; adding an instruction is a new `inst`
//! line, not new code.

mod arith;
mod jmp;
mod misc;
mod mov;
mod muldiv;
mod shift;
mod stack;

use crate::table::InstSpec;

/// Every row the assembler knows, in declaration order per mnemonic.
pub(crate) fn list() -> Vec<InstSpec> {
    let mut all = Vec::new();
    all.extend(arith::list());
    all.extend(mov::list());
    all.extend(shift::list());
    all.extend(muldiv::list());
    all.extend(stack::list());
    all.extend(jmp::list());
    all.extend(misc::list());
    all
}

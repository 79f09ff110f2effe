use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

#[rustfmt::skip]
pub(crate) fn list() -> Vec<InstSpec> {
    vec![
        inst("ret", fmt(ZO, &[]), rex(0xC3), _64b | compat),
        inst("ret", fmt(I, &[imm16]), rex(0xC2).iw(), _64b | compat),

        inst("nop", fmt(ZO, &[]), rex(0x90), _64b | compat),
        inst("int3", fmt(ZO, &[]), rex(0xCC), _64b | compat),
        inst("int", fmt(I, &[imm8]), rex(0xCD).ib(), _64b | compat),
        inst("hlt", fmt(ZO, &[]), rex(0xF4), _64b | compat),

        // Sign extensions of the accumulator.
        inst("cbw", fmt(ZO, &[]), rex([0x66, 0x98]), _64b | compat),
        inst("cwde", fmt(ZO, &[]), rex(0x98), _64b | compat),
        inst("cdqe", fmt(ZO, &[]), rex(0x98).w(), _64b),
        inst("cwd", fmt(ZO, &[]), rex([0x66, 0x99]), _64b | compat),
        inst("cdq", fmt(ZO, &[]), rex(0x99), _64b | compat),
        inst("cqo", fmt(ZO, &[]), rex(0x99).w(), _64b),

        // Flag manipulation.
        inst("clc", fmt(ZO, &[]), rex(0xF8), _64b | compat),
        inst("stc", fmt(ZO, &[]), rex(0xF9), _64b | compat),
        inst("cmc", fmt(ZO, &[]), rex(0xF5), _64b | compat),
        inst("cld", fmt(ZO, &[]), rex(0xFC), _64b | compat),
        inst("std", fmt(ZO, &[]), rex(0xFD), _64b | compat),
    ]
}

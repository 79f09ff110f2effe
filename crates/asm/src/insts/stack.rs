use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

#[rustfmt::skip]
pub(crate) fn list() -> Vec<InstSpec> {
    vec![
        // Note: a 16-bit immediate push changes the stack adjustment, so no
        // imm16 row exists; a small immediate narrows to the sign-extended
        // 8-bit form instead.
        inst("push", fmt(M, &[rm16]), rex([0x66, 0xFF]).digit(6), _64b | compat),
        inst("push", fmt(M, &[rm32]), rex(0xFF).digit(6), compat),
        inst("push", fmt(M, &[rm64]), rex(0xFF).digit(6).d64(), _64b),
        inst("push", fmt(O, &[r16]), rex([0x66, 0x50]), _64b | compat),
        inst("push", fmt(O, &[r32]), rex(0x50), compat),
        inst("push", fmt(O, &[r64]), rex(0x50).d64(), _64b),
        inst("push", fmt(I, &[sximm8]), rex(0x6A).ib(), _64b | compat),
        inst("push", fmt(I, &[imm32]), rex(0x68).id(), _64b | compat),

        inst("pop", fmt(M, &[rm16]), rex([0x66, 0x8F]).digit(0), _64b | compat),
        inst("pop", fmt(M, &[rm32]), rex(0x8F).digit(0), compat),
        inst("pop", fmt(M, &[rm64]), rex(0x8F).digit(0).d64(), _64b),
        inst("pop", fmt(O, &[r16]), rex([0x66, 0x58]), _64b | compat),
        inst("pop", fmt(O, &[r32]), rex(0x58), compat),
        inst("pop", fmt(O, &[r64]), rex(0x58).d64(), _64b),

        inst("leave", fmt(ZO, &[]), rex(0xC9), _64b | compat),
    ]
}

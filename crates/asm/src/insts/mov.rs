use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

#[rustfmt::skip]
pub(crate) fn list() -> Vec<InstSpec> {
    vec![
        inst("mov", fmt(MR, &[rm8, r8]), rex(0x88), _64b | compat),
        inst("mov", fmt(MR, &[rm16, r16]), rex([0x66, 0x89]), _64b | compat),
        inst("mov", fmt(MR, &[rm32, r32]), rex(0x89), _64b | compat),
        inst("mov", fmt(MR, &[rm64, r64]), rex(0x89).w(), _64b),
        inst("mov", fmt(RM, &[r8, rm8]), rex(0x8A), _64b | compat),
        inst("mov", fmt(RM, &[r16, rm16]), rex([0x66, 0x8B]), _64b | compat),
        inst("mov", fmt(RM, &[r32, rm32]), rex(0x8B), _64b | compat),
        inst("mov", fmt(RM, &[r64, rm64]), rex(0x8B).w(), _64b),
        inst("mov", fmt(OI, &[r8, imm8]), rex(0xB0).ib(), _64b | compat),
        inst("mov", fmt(OI, &[r16, imm16]), rex([0x66, 0xB8]).iw(), _64b | compat),
        inst("mov", fmt(OI, &[r32, imm32]), rex(0xB8).id(), _64b | compat),
        inst("mov", fmt(OI, &[r64, imm64]), rex(0xB8).w().io(), _64b),
        inst("mov", fmt(MI, &[rm8, imm8]), rex(0xC6).digit(0).ib(), _64b | compat),
        inst("mov", fmt(MI, &[rm16, imm16]), rex([0x66, 0xC7]).digit(0).iw(), _64b | compat),
        inst("mov", fmt(MI, &[rm32, imm32]), rex(0xC7).digit(0).id(), _64b | compat),
        inst("mov", fmt(MI, &[rm64, sximm32]), rex(0xC7).w().digit(0).id(), _64b),

        inst("movzx", fmt(RM, &[r16, rm8]), rex([0x66, 0x0F, 0xB6]), _64b | compat),
        inst("movzx", fmt(RM, &[r32, rm8]), rex([0x0F, 0xB6]), _64b | compat),
        inst("movzx", fmt(RM, &[r64, rm8]), rex([0x0F, 0xB6]).w(), _64b),
        inst("movzx", fmt(RM, &[r32, rm16]), rex([0x0F, 0xB7]), _64b | compat),
        inst("movzx", fmt(RM, &[r64, rm16]), rex([0x0F, 0xB7]).w(), _64b),

        inst("movsx", fmt(RM, &[r16, rm8]), rex([0x66, 0x0F, 0xBE]), _64b | compat),
        inst("movsx", fmt(RM, &[r32, rm8]), rex([0x0F, 0xBE]), _64b | compat),
        inst("movsx", fmt(RM, &[r64, rm8]), rex([0x0F, 0xBE]).w(), _64b),
        inst("movsx", fmt(RM, &[r32, rm16]), rex([0x0F, 0xBF]), _64b | compat),
        inst("movsx", fmt(RM, &[r64, rm16]), rex([0x0F, 0xBF]).w(), _64b),

        inst("movsxd", fmt(RM, &[r64, rm32]), rex(0x63).w(), _64b),

        inst("lea", fmt(RM, &[r16, m]), rex([0x66, 0x8D]), _64b | compat),
        inst("lea", fmt(RM, &[r32, m]), rex(0x8D), _64b | compat),
        inst("lea", fmt(RM, &[r64, m]), rex(0x8D).w(), _64b),

        // The accumulator short forms come first, as the manual lists them.
        inst("xchg", fmt(O, &[ax, r16]), rex([0x66, 0x90]), _64b | compat),
        inst("xchg", fmt(O, &[r16, ax]), rex([0x66, 0x90]), _64b | compat),
        inst("xchg", fmt(O, &[eax, r32]), rex(0x90), _64b | compat),
        inst("xchg", fmt(O, &[r32, eax]), rex(0x90), _64b | compat),
        inst("xchg", fmt(O, &[rax, r64]), rex(0x90).w(), _64b),
        inst("xchg", fmt(O, &[r64, rax]), rex(0x90).w(), _64b),
        inst("xchg", fmt(MR, &[rm8, r8]), rex(0x86), _64b | compat),
        inst("xchg", fmt(RM, &[r8, rm8]), rex(0x86), _64b | compat),
        inst("xchg", fmt(MR, &[rm16, r16]), rex([0x66, 0x87]), _64b | compat),
        inst("xchg", fmt(RM, &[r16, rm16]), rex([0x66, 0x87]), _64b | compat),
        inst("xchg", fmt(MR, &[rm32, r32]), rex(0x87), _64b | compat),
        inst("xchg", fmt(RM, &[r32, rm32]), rex(0x87), _64b | compat),
        inst("xchg", fmt(MR, &[rm64, r64]), rex(0x87).w(), _64b),
        inst("xchg", fmt(RM, &[r64, rm64]), rex(0x87).w(), _64b),
    ]
}

use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

/// The eight classic ALU operations share one opcode pattern: `base` is the
/// `r/m8, r8` opcode of the family and `digit` selects it in the 0x80 group.
///
/// The sign-extended imm8 rows come first: whenever an immediate fits eight
/// bits the reference assembler prefers the 0x83 form, and declaration order
/// pins that choice under strict parity.
#[rustfmt::skip]
fn alu(name: &'static str, base: u8, digit: u8) -> Vec<InstSpec> {
    vec![
        inst(name, fmt(MI, &[rm16, sximm8]), rex([0x66, 0x83]).digit(digit).ib(), _64b | compat),
        inst(name, fmt(MI, &[rm32, sximm8]), rex(0x83).digit(digit).ib(), _64b | compat),
        inst(name, fmt(MI, &[rm64, sximm8]), rex(0x83).w().digit(digit).ib(), _64b),
        inst(name, fmt(I, &[al, imm8]), rex(base + 0x04).ib(), _64b | compat),
        inst(name, fmt(I, &[ax, imm16]), rex([0x66, base + 0x05]).iw(), _64b | compat),
        inst(name, fmt(I, &[eax, imm32]), rex(base + 0x05).id(), _64b | compat),
        inst(name, fmt(I, &[rax, sximm32]), rex(base + 0x05).w().id(), _64b),
        inst(name, fmt(MI, &[rm8, imm8]), rex(0x80).digit(digit).ib(), _64b | compat),
        inst(name, fmt(MI, &[rm16, imm16]), rex([0x66, 0x81]).digit(digit).iw(), _64b | compat),
        inst(name, fmt(MI, &[rm32, imm32]), rex(0x81).digit(digit).id(), _64b | compat),
        inst(name, fmt(MI, &[rm64, sximm32]), rex(0x81).w().digit(digit).id(), _64b),
        inst(name, fmt(MR, &[rm8, r8]), rex(base), _64b | compat),
        inst(name, fmt(MR, &[rm16, r16]), rex([0x66, base + 0x01]), _64b | compat),
        inst(name, fmt(MR, &[rm32, r32]), rex(base + 0x01), _64b | compat),
        inst(name, fmt(MR, &[rm64, r64]), rex(base + 0x01).w(), _64b),
        inst(name, fmt(RM, &[r8, rm8]), rex(base + 0x02), _64b | compat),
        inst(name, fmt(RM, &[r16, rm16]), rex([0x66, base + 0x03]), _64b | compat),
        inst(name, fmt(RM, &[r32, rm32]), rex(base + 0x03), _64b | compat),
        inst(name, fmt(RM, &[r64, rm64]), rex(base + 0x03).w(), _64b),
    ]
}

#[rustfmt::skip]
pub(crate) fn list() -> Vec<InstSpec> {
    let mut specs = Vec::new();
    specs.extend(alu("add", 0x00, 0));
    specs.extend(alu("or", 0x08, 1));
    specs.extend(alu("adc", 0x10, 2));
    specs.extend(alu("sbb", 0x18, 3));
    specs.extend(alu("and", 0x20, 4));
    specs.extend(alu("sub", 0x28, 5));
    specs.extend(alu("xor", 0x30, 6));
    specs.extend(alu("cmp", 0x38, 7));
    // TEST has no sign-extended imm8 form and no RM direction.
    specs.extend([
        inst("test", fmt(I, &[al, imm8]), rex(0xA8).ib(), _64b | compat),
        inst("test", fmt(I, &[ax, imm16]), rex([0x66, 0xA9]).iw(), _64b | compat),
        inst("test", fmt(I, &[eax, imm32]), rex(0xA9).id(), _64b | compat),
        inst("test", fmt(I, &[rax, sximm32]), rex(0xA9).w().id(), _64b),
        inst("test", fmt(MI, &[rm8, imm8]), rex(0xF6).digit(0).ib(), _64b | compat),
        inst("test", fmt(MI, &[rm16, imm16]), rex([0x66, 0xF7]).digit(0).iw(), _64b | compat),
        inst("test", fmt(MI, &[rm32, imm32]), rex(0xF7).digit(0).id(), _64b | compat),
        inst("test", fmt(MI, &[rm64, sximm32]), rex(0xF7).w().digit(0).id(), _64b),
        inst("test", fmt(MR, &[rm8, r8]), rex(0x84), _64b | compat),
        inst("test", fmt(MR, &[rm16, r16]), rex([0x66, 0x85]), _64b | compat),
        inst("test", fmt(MR, &[rm32, r32]), rex(0x85), _64b | compat),
        inst("test", fmt(MR, &[rm64, r64]), rex(0x85).w(), _64b),
    ]);
    specs
}

use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

/// The unary 0xF6/0xFE groups: one r/m operand, `/digit` selects the
/// operation.
#[rustfmt::skip]
fn group3(name: &'static str, digit: u8) -> Vec<InstSpec> {
    vec![
        inst(name, fmt(M, &[rm8]), rex(0xF6).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm16]), rex([0x66, 0xF7]).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm32]), rex(0xF7).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm64]), rex(0xF7).w().digit(digit), _64b),
    ]
}

#[rustfmt::skip]
pub(crate) fn list() -> Vec<InstSpec> {
    let mut specs = Vec::new();
    specs.extend(group3("not", 2));
    specs.extend(group3("neg", 3));
    specs.extend(group3("mul", 4));
    specs.extend(group3("imul", 5));
    specs.extend(group3("div", 6));
    specs.extend(group3("idiv", 7));
    // Two- and three-operand IMUL.
    specs.extend([
        inst("imul", fmt(RM, &[r16, rm16]), rex([0x66, 0x0F, 0xAF]), _64b | compat),
        inst("imul", fmt(RM, &[r32, rm32]), rex([0x0F, 0xAF]), _64b | compat),
        inst("imul", fmt(RM, &[r64, rm64]), rex([0x0F, 0xAF]).w(), _64b),
        inst("imul", fmt(RMI, &[r16, rm16, sximm8]), rex([0x66, 0x6B]).ib(), _64b | compat),
        inst("imul", fmt(RMI, &[r32, rm32, sximm8]), rex(0x6B).ib(), _64b | compat),
        inst("imul", fmt(RMI, &[r64, rm64, sximm8]), rex(0x6B).w().ib(), _64b),
        inst("imul", fmt(RMI, &[r16, rm16, imm16]), rex([0x66, 0x69]).iw(), _64b | compat),
        inst("imul", fmt(RMI, &[r32, rm32, imm32]), rex(0x69).id(), _64b | compat),
        inst("imul", fmt(RMI, &[r64, rm64, sximm32]), rex(0x69).w().id(), _64b),
    ]);
    // INC/DEC; the one-byte 0x40/0x48 forms only exist outside long mode,
    // where those bytes are REX prefixes.
    specs.extend([
        inst("inc", fmt(M, &[rm8]), rex(0xFE).digit(0), _64b | compat),
        inst("inc", fmt(M, &[rm16]), rex([0x66, 0xFF]).digit(0), _64b | compat),
        inst("inc", fmt(M, &[rm32]), rex(0xFF).digit(0), _64b | compat),
        inst("inc", fmt(M, &[rm64]), rex(0xFF).w().digit(0), _64b),
        inst("inc", fmt(O, &[r16]), rex([0x66, 0x40]), compat),
        inst("inc", fmt(O, &[r32]), rex(0x40), compat),
        inst("dec", fmt(M, &[rm8]), rex(0xFE).digit(1), _64b | compat),
        inst("dec", fmt(M, &[rm16]), rex([0x66, 0xFF]).digit(1), _64b | compat),
        inst("dec", fmt(M, &[rm32]), rex(0xFF).digit(1), _64b | compat),
        inst("dec", fmt(M, &[rm64]), rex(0xFF).w().digit(1), _64b),
        inst("dec", fmt(O, &[r16]), rex([0x66, 0x48]), compat),
        inst("dec", fmt(O, &[r32]), rex(0x48), compat),
    ]);
    specs
}

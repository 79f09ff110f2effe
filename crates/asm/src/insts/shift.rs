use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

/// Rotates and shifts all live in the 0xC0/0xD0 group, distinguished by
/// `/digit`. The by-one forms come first so a count of 1 picks the shorter
/// 0xD1 encoding, as the reference assembler does.
#[rustfmt::skip]
fn group2(name: &'static str, digit: u8) -> Vec<InstSpec> {
    vec![
        inst(name, fmt(M, &[rm8, one]), rex(0xD0).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm16, one]), rex([0x66, 0xD1]).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm32, one]), rex(0xD1).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm64, one]), rex(0xD1).w().digit(digit), _64b),
        inst(name, fmt(M, &[rm8, cl]), rex(0xD2).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm16, cl]), rex([0x66, 0xD3]).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm32, cl]), rex(0xD3).digit(digit), _64b | compat),
        inst(name, fmt(M, &[rm64, cl]), rex(0xD3).w().digit(digit), _64b),
        inst(name, fmt(MI, &[rm8, imm8]), rex(0xC0).digit(digit).ib(), _64b | compat),
        inst(name, fmt(MI, &[rm16, imm8]), rex([0x66, 0xC1]).digit(digit).ib(), _64b | compat),
        inst(name, fmt(MI, &[rm32, imm8]), rex(0xC1).digit(digit).ib(), _64b | compat),
        inst(name, fmt(MI, &[rm64, imm8]), rex(0xC1).w().digit(digit).ib(), _64b),
    ]
}

pub(crate) fn list() -> Vec<InstSpec> {
    let mut specs = Vec::new();
    specs.extend(group2("rol", 0));
    specs.extend(group2("ror", 1));
    specs.extend(group2("rcl", 2));
    specs.extend(group2("rcr", 3));
    specs.extend(group2("shl", 4));
    specs.extend(group2("sal", 4));
    specs.extend(group2("shr", 5));
    specs.extend(group2("sar", 7));
    specs
}

use crate::table::OpEn::*;
use crate::table::OperandSig::*;
use crate::table::{_64b, compat, fmt, inst, rex, InstSpec};

/// Condition codes by their `tttn` encoding. Aliases (`jz` == `je`, …) get
/// their own mnemonic entries pointing at the same opcode.
const JCC: &[(&str, u8)] = &[
    ("jo", 0x0),
    ("jno", 0x1),
    ("jb", 0x2),
    ("jc", 0x2),
    ("jnae", 0x2),
    ("jae", 0x3),
    ("jnb", 0x3),
    ("jnc", 0x3),
    ("je", 0x4),
    ("jz", 0x4),
    ("jne", 0x5),
    ("jnz", 0x5),
    ("jbe", 0x6),
    ("jna", 0x6),
    ("ja", 0x7),
    ("jnbe", 0x7),
    ("js", 0x8),
    ("jns", 0x9),
    ("jp", 0xA),
    ("jpe", 0xA),
    ("jnp", 0xB),
    ("jpo", 0xB),
    ("jl", 0xC),
    ("jnge", 0xC),
    ("jge", 0xD),
    ("jnl", 0xD),
    ("jle", 0xE),
    ("jng", 0xE),
    ("jg", 0xF),
    ("jnle", 0xF),
];

const SETCC: &[(&str, u8)] = &[
    ("seto", 0x0),
    ("setno", 0x1),
    ("setb", 0x2),
    ("setc", 0x2),
    ("setae", 0x3),
    ("setnb", 0x3),
    ("setnc", 0x3),
    ("sete", 0x4),
    ("setz", 0x4),
    ("setne", 0x5),
    ("setnz", 0x5),
    ("setbe", 0x6),
    ("setna", 0x6),
    ("seta", 0x7),
    ("setnbe", 0x7),
    ("sets", 0x8),
    ("setns", 0x9),
    ("setp", 0xA),
    ("setnp", 0xB),
    ("setl", 0xC),
    ("setnge", 0xC),
    ("setge", 0xD),
    ("setnl", 0xD),
    ("setle", 0xE),
    ("setng", 0xE),
    ("setg", 0xF),
    ("setnle", 0xF),
];

#[rustfmt::skip]
pub(crate) fn list() -> Vec<InstSpec> {
    let mut specs = vec![
        inst("call", fmt(D, &[rel32]), rex(0xE8).id(), _64b | compat),
        inst("call", fmt(M, &[rm64]), rex(0xFF).digit(2).d64(), _64b),
        inst("call", fmt(M, &[rm32]), rex(0xFF).digit(2), compat),

        inst("jmp", fmt(D, &[rel8]), rex(0xEB).ib(), _64b | compat),
        inst("jmp", fmt(D, &[rel32]), rex(0xE9).id(), _64b | compat),
        inst("jmp", fmt(M, &[rm64]), rex(0xFF).digit(4).d64(), _64b),
        inst("jmp", fmt(M, &[rm32]), rex(0xFF).digit(4), compat),
    ];
    for &(name, tttn) in JCC {
        specs.push(inst(name, fmt(D, &[rel8]), rex(0x70 + tttn).ib(), _64b | compat));
        specs.push(inst(name, fmt(D, &[rel32]), rex([0x0F, 0x80 + tttn]).id(), _64b | compat));
    }
    for &(name, tttn) in SETCC {
        // The reg field is unused; the reference assembler emits it as 0.
        specs.push(inst(name, fmt(M, &[rm8]), rex([0x0F, 0x90 + tttn]).digit(0), _64b | compat));
    }
    specs
}

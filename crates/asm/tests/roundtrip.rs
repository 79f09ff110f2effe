//! Decode emitted units with an independent decoder and check that operands
//! and branch targets survive the round trip.

use anvil_asm::reg::{EAX, ECX, EDX, R15, RAX, RBX, RCX};
use anvil_asm::{Mem, Mode, Operand, Scale, Unit, Width};
use iced_x86::{Decoder, DecoderOptions, Mnemonic, OpKind, Register};

fn decode_all(bitness: u32, bytes: &[u8]) -> Vec<iced_x86::Instruction> {
    let mut decoder = Decoder::with_ip(bitness, bytes, 0, DecoderOptions::NONE);
    let mut out = Vec::new();
    while decoder.can_decode() {
        out.push(decoder.decode());
    }
    assert!(
        out.iter().all(|i| i.mnemonic() != Mnemonic::INVALID),
        "decoder rejected emitted bytes"
    );
    out
}

#[test]
fn backward_jump_target_round_trips() {
    let mut unit = Unit::new(Mode::Long64);
    unit.define_label("l").unwrap();
    unit.emit("add", &[EAX.into(), Operand::Imm(1)]).unwrap();
    unit.emit("jmp", &[Operand::label("l")]).unwrap();
    let out = unit.assemble().unwrap();
    let target = u64::from(out.label_offset("l").unwrap());

    let insns = decode_all(64, &out.bytes);
    let jmp = insns.last().unwrap();
    assert_eq!(jmp.mnemonic(), Mnemonic::Jmp);
    assert_eq!(jmp.op0_kind(), OpKind::NearBranch64);
    assert_eq!(jmp.near_branch_target(), target);
}

#[test]
fn forward_conditional_targets_round_trip() {
    let mut unit = Unit::new(Mode::Long64);
    unit.emit("cmp", &[EAX.into(), Operand::Imm(0)]).unwrap();
    unit.emit("je", &[Operand::label("done")]).unwrap();
    for _ in 0..10 {
        unit.emit("nop", &[]).unwrap();
    }
    unit.emit("jne", &[Operand::label("far")]).unwrap();
    for _ in 0..150 {
        unit.emit("nop", &[]).unwrap();
    }
    unit.define_label("done").unwrap();
    unit.emit("nop", &[]).unwrap();
    unit.define_label("far").unwrap();
    unit.emit("ret", &[]).unwrap();
    let out = unit.assemble().unwrap();

    let done = u64::from(out.label_offset("done").unwrap());
    let far = u64::from(out.label_offset("far").unwrap());
    let insns = decode_all(64, &out.bytes);
    let branches: Vec<_> = insns
        .iter()
        .filter(|i| matches!(i.mnemonic(), Mnemonic::Je | Mnemonic::Jne))
        .collect();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0].near_branch_target(), done);
    assert_eq!(branches[1].near_branch_target(), far);
}

#[test]
fn memory_operands_round_trip() {
    let mut unit = Unit::new(Mode::Long64);
    unit.emit(
        "mov",
        &[
            RAX.into(),
            Mem::base(RBX).index(RCX, Scale::Four).disp(8).into(),
        ],
    )
    .unwrap();
    unit.emit("mov", &[R15.into(), Mem::base(RAX).disp(-4).into()])
        .unwrap();
    let out = unit.assemble().unwrap();

    let insns = decode_all(64, &out.bytes);
    assert_eq!(insns.len(), 2);

    let first = &insns[0];
    assert_eq!(first.mnemonic(), Mnemonic::Mov);
    assert_eq!(first.op0_register(), Register::RAX);
    assert_eq!(first.memory_base(), Register::RBX);
    assert_eq!(first.memory_index(), Register::RCX);
    assert_eq!(first.memory_index_scale(), 4);
    assert_eq!(first.memory_displacement64(), 8);

    let second = &insns[1];
    assert_eq!(second.op0_register(), Register::R15);
    assert_eq!(second.memory_base(), Register::RAX);
    // -4 sign-extends over the 64-bit address space.
    assert_eq!(second.memory_displacement64(), -4i64 as u64);
}

#[test]
fn protected_mode_sib_round_trips() {
    let mut unit = Unit::new(Mode::Protected32);
    unit.emit(
        "mov",
        &[
            EAX.into(),
            Mem::base(EDX)
                .index(ECX, Scale::Eight)
                .disp(12)
                .width(Width::Dword)
                .into(),
        ],
    )
    .unwrap();
    let out = unit.assemble().unwrap();
    assert_eq!(out.bytes, vec![0x8B, 0x44, 0xCA, 0x0C]);

    let insns = decode_all(32, &out.bytes);
    let mov = &insns[0];
    assert_eq!(mov.memory_base(), Register::EDX);
    assert_eq!(mov.memory_index(), Register::ECX);
    assert_eq!(mov.memory_index_scale(), 8);
    assert_eq!(mov.memory_displacement64(), 12);
}

#[test]
fn decoded_lengths_match_computed_lengths() {
    let mut unit = Unit::new(Mode::Long64);
    unit.emit("push", &[anvil_asm::reg::RBP.into()]).unwrap();
    unit.emit("mov", &[anvil_asm::reg::RBP.into(), anvil_asm::reg::RSP.into()])
        .unwrap();
    unit.emit("sub", &[anvil_asm::reg::RSP.into(), Operand::Imm(0x20)])
        .unwrap();
    unit.emit("call", &[RAX.into()]).unwrap();
    unit.emit("leave", &[]).unwrap();
    unit.emit("ret", &[]).unwrap();
    let out = unit.assemble().unwrap();

    let insns = decode_all(64, &out.bytes);
    let decoded_total: usize = insns.iter().map(|i| i.len()).sum();
    assert_eq!(decoded_total, out.bytes.len());
}

//! Byte-for-byte encoding checks against the reference assembler's output.
//!
//! Each case is `(instruction, "hex", "text")`: the exact bytes the system
//! assembler produces for the same source in Intel-mnemonic mode, plus the
//! expected pretty-printing.

use crate::operand::{byte_ptr, dword_ptr, qword_ptr, word_ptr, Mem, Operand, Scale};
use crate::reg::*;
use crate::settings::AsmCtx;
use crate::{AsmError, Inst, Mode};

fn r(reg: Reg) -> Operand {
    Operand::Reg(reg)
}

fn i(value: i64) -> Operand {
    Operand::Imm(value)
}

fn m(mem: Mem) -> Operand {
    Operand::Mem(mem)
}

fn encode(ctx: &AsmCtx, inst: &Inst) -> String {
    let mut sink = Vec::new();
    inst.encode_into(&mut sink, ctx, None).unwrap();
    let mut hex = String::with_capacity(sink.len() * 2);
    for byte in &sink {
        hex.push_str(&format!("{byte:02X}"));
    }
    hex
}

fn check(mode: Mode, insns: &[(Inst, &str, &str)]) {
    let ctx = AsmCtx::new(mode);
    for (inst, want_hex, want_text) in insns {
        assert_eq!(
            encode(&ctx, inst),
            *want_hex,
            "bytes differ for `{want_text}`"
        );
        assert_eq!(inst.to_string(), *want_text, "text differs");
        assert_eq!(
            inst.len(&ctx),
            want_hex.len() as u32 / 2,
            "length differs for `{want_text}`"
        );
    }
}

fn inst64(mnemonic: &str, ops: &[Operand]) -> Inst {
    Inst::new(mnemonic, ops, &AsmCtx::new(Mode::Long64)).unwrap()
}

fn inst32(mnemonic: &str, ops: &[Operand]) -> Inst {
    Inst::new(mnemonic, ops, &AsmCtx::new(Mode::Protected32)).unwrap()
}

#[test]
fn test_64bit_emit() {
    let mut insns: Vec<(Inst, &str, &str)> = Vec::new();

    // Stack and frame setup.
    insns.push((inst64("push", &[r(RBP)]), "55", "push rbp"));
    insns.push((inst64("push", &[r(R12)]), "4154", "push r12"));
    insns.push((inst64("pop", &[r(RBP)]), "5D", "pop rbp"));
    insns.push((inst64("pop", &[r(R9)]), "4159", "pop r9"));
    insns.push((inst64("push", &[i(1)]), "6A01", "push 1"));
    insns.push((inst64("push", &[i(0x12345)]), "6845230100", "push 0x12345"));
    insns.push((inst64("leave", &[]), "C9", "leave"));

    // Register-to-register moves.
    insns.push((inst64("mov", &[r(RBP), r(RSP)]), "4889E5", "mov rbp, rsp"));
    insns.push((inst64("mov", &[r(EAX), r(EBX)]), "89D8", "mov eax, ebx"));
    insns.push((inst64("mov", &[r(R15), r(RAX)]), "4989C7", "mov r15, rax"));
    insns.push((inst64("mov", &[r(AX), r(CX)]), "6689C8", "mov ax, cx"));
    insns.push((inst64("mov", &[r(AL), r(BL)]), "88D8", "mov al, bl"));

    // Immediate moves; the 64-bit destination narrows to the sign-extended
    // C7 form when the value fits, and widens to the full imm64 otherwise.
    insns.push((inst64("mov", &[r(EAX), i(1)]), "B801000000", "mov eax, 1"));
    insns.push((
        inst64("mov", &[r(RAX), i(1)]),
        "48C7C001000000",
        "mov rax, 1",
    ));
    insns.push((
        inst64("mov", &[r(RAX), i(0x1122334455667788)]),
        "48B88877665544332211",
        "mov rax, 0x1122334455667788",
    ));
    insns.push((
        inst64("mov", &[r(RAX), i(0xFFFFFFFF)]),
        "48B8FFFFFFFF00000000",
        "mov rax, 0xffffffff",
    ));
    insns.push((inst64("mov", &[r(R8B), i(7)]), "41B007", "mov r8b, 7"));
    insns.push((inst64("mov", &[r(SPL), i(1)]), "40B401", "mov spl, 1"));
    insns.push((inst64("mov", &[r(AH), i(1)]), "B401", "mov ah, 1"));

    // Memory addressing forms.
    insns.push((
        inst64("mov", &[r(EAX), m(Mem::base(RBX))]),
        "8B03",
        "mov eax, [rbx]",
    ));
    insns.push((
        inst64("mov", &[r(RAX), m(Mem::base(RBP))]),
        "488B4500",
        "mov rax, [rbp]",
    ));
    insns.push((
        inst64("mov", &[r(RAX), m(Mem::base(R13))]),
        "498B4500",
        "mov rax, [r13]",
    ));
    insns.push((
        inst64("mov", &[r(RAX), m(Mem::base(RSP))]),
        "488B0424",
        "mov rax, [rsp]",
    ));
    insns.push((
        inst64("mov", &[r(RAX), m(Mem::base(R12))]),
        "498B0424",
        "mov rax, [r12]",
    ));
    insns.push((
        inst64("mov", &[r(RAX), m(Mem::base(RBX).index(RCX, Scale::Four).disp(8))]),
        "488B448B08",
        "mov rax, [rbx + rcx*4 + 0x8]",
    ));
    insns.push((
        inst64("mov", &[r(EAX), m(Mem::absolute(0x10))]),
        "8B042510000000",
        "mov eax, [0x10]",
    ));
    insns.push((
        inst64("mov", &[r(EAX), m(Mem::absolute(0).index(R8D, Scale::Four).disp(0x10))]),
        "67428B048510000000",
        "mov eax, [r8d*4 + 0x10]",
    ));
    insns.push((
        inst64("mov", &[m(byte_ptr(Mem::base(RAX))), i(1)]),
        "C60001",
        "mov byte ptr [rax], 1",
    ));
    insns.push((
        inst64("mov", &[m(word_ptr(Mem::base(RAX))), i(5)]),
        "66C7000500",
        "mov word ptr [rax], 5",
    ));
    insns.push((
        inst64("mov", &[m(Mem::base(RAX).segment(FS)), r(ECX)]),
        "648908",
        "mov fs:[rax], ecx",
    ));

    // Wide and sign/zero extending moves.
    insns.push((
        inst64("movzx", &[r(EAX), m(byte_ptr(Mem::base(RBX)))]),
        "0FB603",
        "movzx eax, byte ptr [rbx]",
    ));
    insns.push((inst64("movzx", &[r(EAX), r(CL)]), "0FB6C1", "movzx eax, cl"));
    insns.push((inst64("movsx", &[r(RAX), r(DL)]), "480FBEC2", "movsx rax, dl"));
    insns.push((inst64("movsxd", &[r(RAX), r(ECX)]), "4863C1", "movsxd rax, ecx"));
    insns.push((
        inst64("lea", &[r(RAX), m(Mem::base(RBX).index(RCX, Scale::Four).disp(8))]),
        "488D448B08",
        "lea rax, [rbx + rcx*4 + 0x8]",
    ));

    // ALU immediates narrow to the sign-extended imm8 form when possible,
    // and prefer the accumulator short form otherwise.
    insns.push((inst64("add", &[r(EAX), i(1)]), "83C001", "add eax, 1"));
    insns.push((inst64("add", &[r(EAX), i(300)]), "052C010000", "add eax, 0x12c"));
    insns.push((inst64("add", &[r(AL), i(5)]), "0405", "add al, 5"));
    insns.push((inst64("add", &[r(BL), i(5)]), "80C305", "add bl, 5"));
    insns.push((inst64("add", &[r(CX), i(100)]), "6683C164", "add cx, 0x64"));
    insns.push((
        inst64("add", &[m(qword_ptr(Mem::base(RAX))), i(7)]),
        "48830007",
        "add qword ptr [rax], 7",
    ));
    insns.push((inst64("add", &[r(RAX), r(RBX)]), "4801D8", "add rax, rbx"));
    insns.push((
        inst64("add", &[r(RAX), m(Mem::base(RDI))]),
        "480307",
        "add rax, [rdi]",
    ));
    insns.push((inst64("and", &[r(RSP), i(-16)]), "4883E4F0", "and rsp, -0x10"));
    insns.push((inst64("sub", &[r(RSP), i(0x20)]), "4883EC20", "sub rsp, 0x20"));
    insns.push((inst64("xor", &[r(EAX), r(EAX)]), "31C0", "xor eax, eax"));
    insns.push((
        inst64("cmp", &[m(dword_ptr(Mem::base(RBP).disp(-4))), i(0)]),
        "837DFC00",
        "cmp dword ptr [rbp - 0x4], 0",
    ));
    insns.push((inst64("add", &[r(AH), r(BH)]), "00FC", "add ah, bh"));
    insns.push((inst64("test", &[r(EAX), i(1)]), "A901000000", "test eax, 1"));
    insns.push((inst64("test", &[r(AL), r(AL)]), "84C0", "test al, al"));

    // Unary group and multiplies.
    insns.push((
        inst64("not", &[m(qword_ptr(Mem::base(RBX)))]),
        "48F713",
        "not qword ptr [rbx]",
    ));
    insns.push((inst64("neg", &[r(EAX)]), "F7D8", "neg eax"));
    insns.push((inst64("mul", &[r(RCX)]), "48F7E1", "mul rcx"));
    insns.push((inst64("idiv", &[r(EDI)]), "F7FF", "idiv edi"));
    insns.push((inst64("imul", &[r(RAX), r(RCX)]), "480FAFC1", "imul rax, rcx"));
    insns.push((
        inst64("imul", &[r(EAX), r(ECX), i(10)]),
        "6BC10A",
        "imul eax, ecx, 0xa",
    ));
    insns.push((
        inst64("imul", &[r(EAX), r(ECX), i(1000)]),
        "69C1E8030000",
        "imul eax, ecx, 0x3e8",
    ));
    insns.push((inst64("inc", &[r(EAX)]), "FFC0", "inc eax"));
    insns.push((inst64("dec", &[r(R11)]), "49FFCB", "dec r11"));

    // Shifts and rotates.
    insns.push((inst64("shl", &[r(EAX), i(1)]), "D1E0", "shl eax, 1"));
    insns.push((inst64("shl", &[r(EAX), i(5)]), "C1E005", "shl eax, 5"));
    insns.push((inst64("shl", &[r(RAX), r(CL)]), "48D3E0", "shl rax, cl"));
    insns.push((inst64("sar", &[r(EDX), i(2)]), "C1FA02", "sar edx, 2"));
    insns.push((inst64("ror", &[r(EBX), i(3)]), "C1CB03", "ror ebx, 3"));

    // Exchanges.
    insns.push((inst64("xchg", &[r(EAX), r(ECX)]), "91", "xchg eax, ecx"));
    insns.push((inst64("xchg", &[r(ECX), r(EDX)]), "87D1", "xchg ecx, edx"));

    // Calls, returns, interrupts.
    insns.push((inst64("call", &[r(RAX)]), "FFD0", "call rax"));
    insns.push((
        inst64("call", &[m(qword_ptr(Mem::base(RBX)))]),
        "FF13",
        "call qword ptr [rbx]",
    ));
    insns.push((inst64("jmp", &[r(RAX)]), "FFE0", "jmp rax"));
    insns.push((inst64("ret", &[]), "C3", "ret"));
    insns.push((inst64("ret", &[i(8)]), "C20800", "ret 8"));
    insns.push((inst64("int3", &[]), "CC", "int3"));
    insns.push((inst64("int", &[i(0x80)]), "CD80", "int 0x80"));
    insns.push((inst64("nop", &[]), "90", "nop"));
    insns.push((inst64("hlt", &[]), "F4", "hlt"));
    insns.push((inst64("cdq", &[]), "99", "cdq"));
    insns.push((inst64("cqo", &[]), "4899", "cqo"));
    insns.push((inst64("cwde", &[]), "98", "cwde"));

    // Condition-code family.
    insns.push((inst64("setne", &[r(AL)]), "0F95C0", "setne al"));
    insns.push((inst64("sete", &[r(DL)]), "0F94C2", "sete dl"));
    insns.push((
        inst64("setb", &[m(byte_ptr(Mem::base(RDI)))]),
        "0F9207",
        "setb byte ptr [rdi]",
    ));

    // LOCK-prefixed read-modify-write.
    insns.push((
        inst64("add", &[m(dword_ptr(Mem::base(RAX))), i(1)])
            .with_lock()
            .unwrap(),
        "F0830001",
        "lock add dword ptr [rax], 1",
    ));

    check(Mode::Long64, &insns);
}

#[test]
fn test_32bit_emit() {
    let mut insns: Vec<(Inst, &str, &str)> = Vec::new();

    insns.push((inst32("push", &[r(EBP)]), "55", "push ebp"));
    insns.push((inst32("mov", &[r(EBP), r(ESP)]), "89E5", "mov ebp, esp"));
    insns.push((
        inst32("mov", &[r(EAX), m(Mem::base(EDX).index(ECX, Scale::Eight).disp(12).width(Width::Dword))]),
        "8B44CA0C",
        "mov eax, dword ptr [edx + ecx*8 + 0xc]",
    ));
    insns.push((
        inst32("mov", &[r(EAX), m(Mem::base(EBP))]),
        "8B4500",
        "mov eax, [ebp]",
    ));
    insns.push((
        inst32("mov", &[r(EAX), m(Mem::absolute(0x1234))]),
        "8B0534120000",
        "mov eax, [0x1234]",
    ));
    insns.push((inst32("inc", &[r(EAX)]), "40", "inc eax"));
    insns.push((inst32("dec", &[r(ECX)]), "49", "dec ecx"));
    insns.push((inst32("inc", &[m(dword_ptr(Mem::base(EAX)))]), "FF00", "inc dword ptr [eax]"));
    insns.push((inst32("add", &[r(EAX), i(1)]), "83C001", "add eax, 1"));
    insns.push((inst32("call", &[r(EAX)]), "FFD0", "call eax"));
    insns.push((inst32("jmp", &[r(ECX)]), "FFE1", "jmp ecx"));
    insns.push((inst32("ret", &[]), "C3", "ret"));
    insns.push((inst32("push", &[m(dword_ptr(Mem::base(ESP).disp(4)))]), "FF742404", "push dword ptr [esp + 0x4]"));

    check(Mode::Protected32, &insns);
}

#[test]
fn rex_is_emitted_only_when_needed() {
    let ctx = AsmCtx::new(Mode::Long64);
    // No REX byte: 32-bit operands, low registers.
    let plain = Inst::new("mov", &[r(EAX), r(EBX)], &ctx).unwrap();
    let mut sink = Vec::new();
    plain.encode_into(&mut sink, &ctx, None).unwrap();
    assert!(sink.iter().all(|b| (*b & 0xF0) != 0x40));

    // Zero-valued REX still appears for spl..dil.
    let forced = Inst::new("mov", &[r(SIL), r(AL)], &ctx).unwrap();
    sink.clear();
    forced.encode_into(&mut sink, &ctx, None).unwrap();
    assert_eq!(sink[0], 0x40);
}

#[test]
fn high_byte_with_rex_is_rejected() {
    let ctx = AsmCtx::new(Mode::Long64);
    assert!(matches!(
        Inst::new("mov", &[r(AH), r(SIL)], &ctx),
        Err(AsmError::OperandMisuse { .. })
    ));
    assert!(matches!(
        Inst::new("mov", &[r(AH), r(R8B)], &ctx),
        Err(AsmError::OperandMisuse { .. })
    ));
    // But plain high-byte use is fine.
    assert!(Inst::new("mov", &[r(AH), r(BL)], &ctx).is_ok());
}

#[test]
fn arch_mismatches_are_rejected() {
    let ctx32 = AsmCtx::new(Mode::Protected32);
    assert!(matches!(
        Inst::new("mov", &[r(RAX), r(RBX)], &ctx32),
        Err(AsmError::ArchMismatch { .. })
    ));
    assert!(matches!(
        Inst::new("inc", &[r(R8D)], &ctx32),
        Err(AsmError::ArchMismatch { .. })
    ));
}

#[test]
fn immediate_range_errors() {
    let ctx = AsmCtx::new(Mode::Long64);
    assert!(matches!(
        Inst::new("add", &[r(EAX), i(1i64 << 40)], &ctx),
        Err(AsmError::ImmediateOutOfRange { .. })
    ));
    assert!(matches!(
        Inst::new("ret", &[i(0x10000)], &ctx),
        Err(AsmError::ImmediateOutOfRange { .. })
    ));
}

#[test]
fn no_matching_form_lists_signatures() {
    let ctx = AsmCtx::new(Mode::Long64);
    // An unsized memory with an immediate is ambiguous.
    let err = Inst::new("add", &[m(Mem::base(RAX)), i(1)], &ctx).unwrap_err();
    match err {
        AsmError::NoMatchingForm { mnemonic, tried, .. } => {
            assert_eq!(mnemonic, "add");
            assert!(tried.contains("r/m32"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lock_validation() {
    let ctx = AsmCtx::new(Mode::Long64);
    // LOCK with a register destination is refused.
    let inst = Inst::new("add", &[r(EAX), i(1)], &ctx).unwrap();
    assert!(inst.with_lock().is_err());
    // LOCK on a non-lockable instruction is refused.
    let inst = Inst::new("mov", &[m(dword_ptr(Mem::base(RAX))), i(1)], &ctx).unwrap();
    assert!(inst.with_lock().is_err());
}

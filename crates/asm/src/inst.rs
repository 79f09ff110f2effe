//! The instruction object: a mnemonic bound to concrete operands and the
//! encoding row selected for them.
//!
//! Label-free instructions pick their row at construction time; instructions
//! that branch to a label start on their longest form and may be shrunk by
//! the assembly unit once the label distance is known.

use core::fmt;
use smallvec::SmallVec;

use crate::error::{AsmError, AsmResult};
use crate::mode::Mode;
use crate::operand::{Mem, Operand};
use crate::reg::{RegClass, Width};
use crate::rex::{self, encode_modrm, encode_sib, prefix, Disp, RexFlags};
use crate::settings::AsmCtx;
use crate::sink::{CodeOffset, CodeSink};
use crate::table::{self, OpEn, OperandSig, Row};

/// Mnemonics whose memory forms accept a LOCK prefix.
const LOCKABLE: &[&str] = &[
    "adc", "add", "and", "dec", "inc", "neg", "not", "or", "sbb", "sub", "xchg", "xor",
];

/// How the encoding row was (or will be) determined.
#[derive(Debug)]
enum Chosen {
    /// Fully determined at construction.
    Fixed(&'static Row),
    /// A branch to a label: candidate rows ordered short to long; `chosen`
    /// starts on the longest and only ever moves toward shorter forms.
    PcRel {
        rows: SmallVec<[&'static Row; 2]>,
        chosen: usize,
    },
    /// A label used as an absolute-address immediate, patched after the code
    /// page base is known.
    AbsLabel(&'static Row),
}

/// A bound instruction.
#[derive(Debug)]
pub struct Inst {
    mnemonic: String,
    operands: Vec<Operand>,
    mode: Mode,
    lock: bool,
    chosen: Chosen,
}

impl Inst {
    /// Bind `mnemonic` to `operands`, validating them and selecting an
    /// encoding row under `ctx`.
    pub fn new(mnemonic: &str, operands: &[Operand], ctx: &AsmCtx) -> AsmResult<Inst> {
        let mnemonic = mnemonic.to_ascii_lowercase();
        for (index, op) in operands.iter().enumerate() {
            match op {
                Operand::Reg(r) => {
                    if r.long_mode_only() && !ctx.mode.is_64() {
                        return Err(AsmError::ArchMismatch {
                            what: r.name().to_string(),
                            mode: ctx.mode,
                        });
                    }
                    if r.class() == RegClass::Segment {
                        return Err(AsmError::misuse(
                            &mnemonic,
                            index,
                            "segment registers are only valid as overrides on memory operands",
                        ));
                    }
                }
                Operand::Mem(mem) => {
                    mem.validate(ctx.mode)
                        .map_err(|e| contextualize(e, &mnemonic, index))?;
                }
                _ => {}
            }
        }

        let has_label = operands.iter().any(|o| matches!(o, Operand::Label(_)));
        let chosen = if has_label {
            choose_label_rows(&mnemonic, operands, ctx)?
        } else {
            Chosen::Fixed(table::select(&mnemonic, operands, ctx, false)?)
        };

        let inst = Inst {
            mnemonic,
            operands: operands.to_vec(),
            mode: ctx.mode,
            lock: false,
            chosen,
        };
        if let Chosen::Fixed(row) | Chosen::AbsLabel(row) = &inst.chosen {
            inst.check_rex_conflict(row)?;
        }
        Ok(inst)
    }

    /// Request a LOCK prefix; only legal on the lockable read-modify-write
    /// instructions with a memory operand.
    pub fn with_lock(mut self) -> AsmResult<Self> {
        if !LOCKABLE.contains(&self.mnemonic.as_str()) {
            return Err(AsmError::misuse(
                &self.mnemonic,
                0,
                "LOCK is not valid for this instruction",
            ));
        }
        let mem_ok = if self.mnemonic == "xchg" {
            self.operands.iter().any(|o| o.as_mem().is_some())
        } else {
            matches!(self.operands.first(), Some(Operand::Mem(_)))
        };
        if !mem_ok {
            return Err(AsmError::misuse(
                &self.mnemonic,
                0,
                "LOCK requires a memory destination",
            ));
        }
        self.lock = true;
        Ok(self)
    }

    /// The lowercase mnemonic.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// The operand tuple.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// The mode this instruction was validated under.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The current encoded length in bytes. For an unresolved branch this is
    /// the provisional length of the currently chosen (initially longest)
    /// form.
    pub fn len(&self, ctx: &AsmCtx) -> u32 {
        let row = match &self.chosen {
            Chosen::Fixed(row) | Chosen::AbsLabel(row) => *row,
            Chosen::PcRel { rows, chosen } => rows[*chosen],
        };
        table::encoded_len(row, &self.operands, ctx, self.lock)
    }

    /// Whether the final size still depends on an unresolved label distance.
    pub fn is_size_variable(&self) -> bool {
        matches!(&self.chosen, Chosen::PcRel { rows, chosen } if *chosen > 0 && rows.len() > 1)
    }

    /// The label this instruction branches to, if it is a relative branch.
    pub(crate) fn branch_label(&self) -> Option<&str> {
        match &self.chosen {
            Chosen::PcRel { .. } => self.operands.iter().find_map(|o| match o {
                Operand::Label(name) => Some(name.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// The label this instruction embeds as an absolute address, if any.
    pub(crate) fn abs_label(&self) -> Option<&str> {
        match &self.chosen {
            Chosen::AbsLabel(_) => self.operands.iter().find_map(|o| match o {
                Operand::Label(name) => Some(name.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// The length this instruction would have in its next shorter branch
    /// form, if one remains available.
    pub(crate) fn shorter_len(&self, ctx: &AsmCtx) -> Option<u32> {
        match &self.chosen {
            Chosen::PcRel { rows, chosen } if *chosen > 0 => Some(table::encoded_len(
                rows[*chosen - 1],
                &self.operands,
                ctx,
                self.lock,
            )),
            _ => None,
        }
    }

    /// Move to the next shorter branch form if `disp` (computed against the
    /// shorter length) fits it. Returns true when the instruction shrank.
    pub(crate) fn shrink(&mut self, disp: i64) -> bool {
        if let Chosen::PcRel { rows, chosen } = &mut self.chosen {
            if *chosen > 0 {
                let shorter = rows[*chosen - 1];
                let fits = match shorter.rel_width() {
                    Some(Width::Byte) => i8::try_from(disp).is_ok(),
                    Some(Width::Dword) => i32::try_from(disp).is_ok(),
                    _ => false,
                };
                if fits {
                    *chosen -= 1;
                    return true;
                }
            }
        }
        false
    }

    /// Encode into `sink`. `rel` carries the resolved displacement for a
    /// relative branch (measured from the end of this instruction). Returns
    /// the position and width of an absolute-address immediate slot, if this
    /// instruction reserved one.
    pub(crate) fn encode_into(
        &self,
        sink: &mut impl CodeSink,
        ctx: &AsmCtx,
        rel: Option<i64>,
    ) -> AsmResult<Option<(CodeOffset, Width)>> {
        let row = match &self.chosen {
            Chosen::Fixed(row) | Chosen::AbsLabel(row) => *row,
            Chosen::PcRel { rows, chosen } => rows[*chosen],
        };
        self.encode_row(row, sink, ctx, rel)
    }

    /// Reject combinations of a high-byte register with anything that forces
    /// a REX prefix.
    fn check_rex_conflict(&self, row: &Row) -> AsmResult<()> {
        if !self.mode.is_64() {
            return Ok(());
        }
        if !table::rex_needed(row, &self.operands) {
            return Ok(());
        }
        for (index, op) in self.operands.iter().enumerate() {
            if let Operand::Reg(r) = op {
                if r.is_high_byte() {
                    return Err(AsmError::misuse(
                        &self.mnemonic,
                        index,
                        format!("{r} cannot be encoded in an instruction requiring a REX prefix"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn encode_row(
        &self,
        row: &Row,
        sink: &mut impl CodeSink,
        ctx: &AsmCtx,
        rel: Option<i64>,
    ) -> AsmResult<Option<(CodeOffset, Width)>> {
        let ops = &self.operands;
        let mem = ops.iter().find_map(|o| o.as_mem());

        // Legacy prefixes, in the manual's group order.
        if self.lock {
            sink.put1(prefix::LOCK);
        }
        if let Some(seg) = mem.and_then(Mem::seg_override) {
            sink.put1(seg.prefix_byte());
        }
        if row.prefix66 {
            sink.put1(prefix::OPERAND_SIZE);
        }
        if let Some(mem) = mem {
            if ctx.mode.is_64() && mem.address_width(ctx.mode) == Width::Dword {
                sink.put1(prefix::ADDRESS_SIZE);
            }
        }

        // Field assignments by operand-encoding tag.
        let o_reg_idx = row
            .sig
            .iter()
            .position(|s| matches!(s, OperandSig::r8 | OperandSig::r16 | OperandSig::r32 | OperandSig::r64));
        let (reg_field, rm_idx): (Option<u8>, Option<usize>) = match row.open {
            OpEn::RM => (ops[0].as_reg().map(|r| r.enc()), Some(1)),
            OpEn::RMI => (ops[0].as_reg().map(|r| r.enc()), Some(1)),
            OpEn::MR => (ops[1].as_reg().map(|r| r.enc()), Some(0)),
            OpEn::MI | OpEn::M => (row.digit, Some(0)),
            OpEn::O | OpEn::OI | OpEn::I | OpEn::D | OpEn::ZO => (None, None),
        };

        // REX.
        if ctx.mode.is_64() {
            let mut rexf = if row.rex_w {
                RexFlags::with_w()
            } else {
                RexFlags::new()
            };
            if matches!(row.open, OpEn::RM | OpEn::MR | OpEn::RMI) {
                if let Some(enc) = reg_field {
                    rexf.set_reg(enc);
                }
            }
            match rm_idx.map(|i| &ops[i]) {
                Some(Operand::Reg(r)) => {
                    rexf.set_base(r.enc());
                }
                Some(Operand::Mem(mem)) => {
                    if let Some(base) = mem.base_reg() {
                        rexf.set_base(base.enc());
                    }
                    if let Some(index) = mem.index_reg() {
                        rexf.set_index(index.enc());
                    }
                }
                _ => {}
            }
            if matches!(row.open, OpEn::O | OpEn::OI) {
                if let Some(r) = o_reg_idx.and_then(|i| ops[i].as_reg()) {
                    rexf.set_base(r.enc());
                }
            }
            for op in ops {
                if let Operand::Reg(r) = op {
                    if r.needs_rex_for_byte() {
                        rexf.always_emit();
                    }
                }
            }
            debug_assert!(
                !(rexf.must_emit()
                    && ops
                        .iter()
                        .any(|o| matches!(o, Operand::Reg(r) if r.is_high_byte()))),
                "high-byte register with REX was not rejected during binding"
            );
            rexf.emit(sink);
        }

        // Opcode bytes; the O/OI forms fold a register into the last byte.
        let mut opcode = row.opcode.clone();
        if matches!(row.open, OpEn::O | OpEn::OI) {
            let r = o_reg_idx
                .and_then(|i| ops[i].as_reg())
                .expect("O-form row without a register operand");
            *opcode.last_mut().expect("empty opcode") += r.enc() & 7;
        }
        for byte in &opcode {
            sink.put1(*byte);
        }

        // ModR/M, SIB and displacement.
        if let Some(rm_idx) = rm_idx {
            let reg_g = reg_field.expect("ModR/M row without a reg field") & 7;
            match &ops[rm_idx] {
                Operand::Reg(r) => sink.put1(encode_modrm(0b11, reg_g, r.enc() & 7)),
                Operand::Mem(mem) => emit_mem(sink, reg_g, mem, ctx.mode),
                _ => unreachable!("r/m slot holds neither register nor memory"),
            }
        }

        // Trailing immediate.
        if let Some(width) = row.imm_width() {
            let imm_idx = row
                .sig
                .iter()
                .position(|s| {
                    matches!(
                        s,
                        OperandSig::imm8
                            | OperandSig::imm16
                            | OperandSig::imm32
                            | OperandSig::imm64
                            | OperandSig::sximm8
                            | OperandSig::sximm32
                    )
                })
                .expect("immediate width without an immediate slot");
            match &ops[imm_idx] {
                Operand::Imm(v) => rex::emit_imm(sink, width, *v),
                Operand::Label(_) => {
                    let at = sink.current_offset();
                    rex::emit_imm(sink, width, 0);
                    return Ok(Some((at, width)));
                }
                _ => unreachable!("immediate slot holds neither value nor label"),
            }
        }

        // Trailing relative displacement.
        if row.open == OpEn::D {
            let width = row.rel_width().expect("D row without a rel slot");
            let value = match (&ops[0], rel) {
                (Operand::Label(_), Some(disp)) => disp,
                (Operand::Label(name), None) => {
                    return Err(AsmError::UndefinedLabel(name.clone()))
                }
                (Operand::Imm(v), _) => *v,
                _ => unreachable!("rel slot holds neither label nor value"),
            };
            let in_range = match width {
                Width::Byte => i8::try_from(value).is_ok(),
                Width::Dword => i32::try_from(value).is_ok(),
                _ => false,
            };
            if !in_range {
                return Err(AsmError::DisplacementOutOfRange(value));
            }
            rex::emit_imm(sink, width, value);
        }

        Ok(None)
    }
}

/// Pick the candidate rows for an instruction that references a label.
fn choose_label_rows(mnemonic: &str, ops: &[Operand], ctx: &AsmCtx) -> AsmResult<Chosen> {
    let rows =
        table::rows(mnemonic).ok_or_else(|| AsmError::UnknownMnemonic(mnemonic.to_string()))?;
    let rel: SmallVec<[&'static Row; 2]> = rows
        .iter()
        .filter(|row| row.rel_width().is_some() && table::row_matches(row, ops, ctx))
        .collect();
    if !rel.is_empty() {
        debug_assert!(
            rel.windows(2)
                .all(|w| w[0].rel_width() <= w[1].rel_width()),
            "{mnemonic}: rel rows must be declared short to long"
        );
        let chosen = rel.len() - 1;
        return Ok(Chosen::PcRel { rows: rel, chosen });
    }
    // Not a branch: the label stands for an absolute address immediate.
    let row = table::select(mnemonic, ops, ctx, false)?;
    debug_assert_eq!(
        row.imm_width().map(Width::bits),
        Some(ctx.mode.pointer_width().bits()),
        "{mnemonic}: absolute label row must reserve a pointer-sized slot"
    );
    Ok(Chosen::AbsLabel(row))
}

/// Emit the ModR/M + SIB + displacement group for a memory operand.
///
/// Special cases, per the Intel SDM addressing-form tables: an r/m of 100
/// escapes to a SIB byte, so `rsp`/`r12` bases always go through SIB; a mod
/// of 00 with r/m (or SIB base) 101 drops the base, so `rbp`/`r13` bases
/// require an explicit displacement; mod=00 r/m=101 itself is RIP-relative
/// in long mode and plain disp32 in 32-bit mode.
fn emit_mem(sink: &mut impl CodeSink, reg_g: u8, mem: &Mem, mode: Mode) {
    const RSP: u8 = 4;
    const RBP: u8 = 5;
    match (mem.base_reg(), mem.index_reg()) {
        (None, None) => {
            if mode.is_64() {
                sink.put1(encode_modrm(0b00, reg_g, 0b100));
                sink.put1(encode_sib(0b00, 0b100, 0b101));
            } else {
                sink.put1(encode_modrm(0b00, reg_g, 0b101));
            }
            sink.put4(mem.disp_value() as u32);
        }
        (Some(base), None) => {
            let enc_e = base.enc();
            let mut disp = Disp::new(mem.disp_value());
            if enc_e & 7 == RSP {
                sink.put1(encode_modrm(disp.m0d(), reg_g, 0b100));
                sink.put1(encode_sib(0b00, 0b100, 0b100));
                disp.emit(sink);
            } else {
                if enc_e & 7 == RBP {
                    disp.force_disp8();
                }
                sink.put1(encode_modrm(disp.m0d(), reg_g, enc_e & 7));
                disp.emit(sink);
            }
        }
        (Some(base), Some(index)) => {
            debug_assert!(index.enc() != RSP, "index register cannot be rsp/esp");
            let mut disp = Disp::new(mem.disp_value());
            if base.enc() & 7 == RBP {
                disp.force_disp8();
            }
            sink.put1(encode_modrm(disp.m0d(), reg_g, 0b100));
            sink.put1(encode_sib(
                mem.scale_factor().enc(),
                index.enc() & 7,
                base.enc() & 7,
            ));
            disp.emit(sink);
        }
        (None, Some(index)) => {
            sink.put1(encode_modrm(0b00, reg_g, 0b100));
            sink.put1(encode_sib(mem.scale_factor().enc(), index.enc() & 7, 0b101));
            sink.put4(mem.disp_value() as u32);
        }
    }
}

fn contextualize(err: AsmError, mnemonic: &str, index: usize) -> AsmError {
    match err {
        AsmError::OperandMisuse { reason, .. } => AsmError::OperandMisuse {
            mnemonic: mnemonic.to_string(),
            index,
            reason,
        },
        other => other,
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.lock {
            write!(f, "lock ")?;
        }
        write!(f, "{}", self.mnemonic)?;
        for (i, op) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " {op}")?;
            } else {
                write!(f, ", {op}")?;
            }
        }
        Ok(())
    }
}

//! The instruction spec table.
//!
//! For each mnemonic the table holds an ordered list of encoding rows, each
//! one a transcription of a line from the Intel reference: an operand
//! signature, the opcode bytes, the operand-encoding tag, an optional
//! `/digit` opcode extension, and the mode legality. Rows are data; teaching
//! the assembler a new instruction means adding rows in `insts/`, not code.
//!
//! Rows are written with a small builder DSL mirroring the reference
//! notation, e.g. `REX.W + 81 /0 id` becomes `rex(0x81).w().digit(0).id()`.

use once_cell::sync::Lazy;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::BitOr;

use crate::error::{AsmError, AsmResult};
use crate::insts;
use crate::operand::{Mem, Operand};
use crate::reg::{RegClass, Width, AL, AX, CL, EAX, RAX};
use crate::rex::Disp;
use crate::settings::AsmCtx;

/// One slot of an operand signature, using the Intel reference's codes.
///
/// Lowercase variant names keep the table files close to the manual's
/// notation, as in `fmt(MI, &[rm32, imm32])`.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSig {
    /// The `al` register exactly.
    al,
    /// The `cl` register exactly (shift counts).
    cl,
    /// The `ax` register exactly.
    ax,
    /// The `eax` register exactly.
    eax,
    /// The `rax` register exactly.
    rax,
    /// The constant 1 (short shift forms).
    one,
    /// A byte register.
    r8,
    /// A word register.
    r16,
    /// A doubleword register.
    r32,
    /// A quadword register.
    r64,
    /// A byte register or byte-sized memory reference.
    rm8,
    /// A word register or word-sized memory reference.
    rm16,
    /// A doubleword register or dword-sized memory reference.
    rm32,
    /// A quadword register or qword-sized memory reference.
    rm64,
    /// A memory reference of any width (`lea`).
    m,
    /// An 8-bit immediate (signed or unsigned representation).
    imm8,
    /// A 16-bit immediate.
    imm16,
    /// A 32-bit immediate.
    imm32,
    /// A full 64-bit immediate.
    imm64,
    /// An 8-bit immediate sign-extended to the operand width.
    sximm8,
    /// A 32-bit immediate sign-extended to 64 bits.
    sximm32,
    /// An 8-bit relative branch displacement.
    rel8,
    /// A 32-bit relative branch displacement.
    rel32,
    /// An absolute memory offset; reserved, no carried row uses it.
    moffs,
    /// An SSE register; reserved for the SSE extension of the table.
    xmm,
    /// An SSE register or 128-bit memory reference; reserved.
    xmm_m128,
    /// An x87 stack register; reserved.
    st,
}

impl OperandSig {
    /// The operand width this signature slot implies, if any.
    pub fn width(self) -> Option<Width> {
        use OperandSig::*;
        match self {
            al | cl | r8 | rm8 | imm8 | sximm8 => Some(Width::Byte),
            ax | r16 | rm16 | imm16 => Some(Width::Word),
            eax | r32 | rm32 | imm32 => Some(Width::Dword),
            rax | r64 | rm64 | imm64 | sximm32 => Some(Width::Qword),
            xmm | xmm_m128 => Some(Width::Oword),
            st => Some(Width::Tword),
            one | m | rel8 | rel32 | moffs => None,
        }
    }

    /// True for the register-class slots that pin an operand size (used to
    /// decide whether an unsized memory operand is acceptable elsewhere in
    /// the row).
    fn is_reg_anchor(self) -> bool {
        use OperandSig::*;
        matches!(self, al | cl | ax | eax | rax | r8 | r16 | r32 | r64)
    }

    /// True for the relative-displacement slots.
    pub fn is_rel(self) -> bool {
        matches!(self, OperandSig::rel8 | OperandSig::rel32)
    }
}

impl core::fmt::Display for OperandSig {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use OperandSig::*;
        let s = match self {
            al => "al",
            cl => "cl",
            ax => "ax",
            eax => "eax",
            rax => "rax",
            one => "1",
            r8 => "r8",
            r16 => "r16",
            r32 => "r32",
            r64 => "r64",
            rm8 => "r/m8",
            rm16 => "r/m16",
            rm32 => "r/m32",
            rm64 => "r/m64",
            m => "m",
            imm8 => "imm8",
            imm16 => "imm16",
            imm32 => "imm32",
            imm64 => "imm64",
            sximm8 => "imm8(sx)",
            sximm32 => "imm32(sx)",
            rel8 => "rel8",
            rel32 => "rel32",
            moffs => "moffs",
            xmm => "xmm",
            xmm_m128 => "xmm/m128",
            st => "st(i)",
        };
        f.write_str(s)
    }
}

/// How operand slots map into encoding fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpEn {
    /// reg field <- operand 0, r/m field <- operand 1.
    RM,
    /// r/m field <- operand 0, reg field <- operand 1.
    MR,
    /// r/m field <- operand 0, immediate <- operand 1; reg field carries the
    /// `/digit` extension.
    MI,
    /// opcode low 3 bits <- operand register index, immediate <- the other
    /// operand.
    OI,
    /// opcode low 3 bits <- operand register index, no immediate.
    O,
    /// r/m field <- the r/m operand; reg field carries the `/digit`
    /// extension.
    M,
    /// immediate <- the immediate operand; any register slots are fixed.
    I,
    /// reg field <- operand 0, r/m field <- operand 1, immediate <- operand 2.
    RMI,
    /// relative displacement <- operand 0.
    D,
    /// no operands in encoding fields.
    ZO,
}

impl OpEn {
    /// Whether this tag produces a ModR/M byte.
    pub fn has_modrm(self) -> bool {
        matches!(self, OpEn::RM | OpEn::MR | OpEn::MI | OpEn::M | OpEn::RMI)
    }
}

/// Mode legality of a row, combined with `|` as in `_64b | compat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modes {
    pub(crate) long64: bool,
    pub(crate) prot32: bool,
}

/// Legal in 64-bit mode.
#[allow(non_upper_case_globals)]
pub const _64b: Modes = Modes {
    long64: true,
    prot32: false,
};

/// Legal in 32-bit protected mode.
#[allow(non_upper_case_globals)]
pub const compat: Modes = Modes {
    long64: false,
    prot32: true,
};

impl BitOr for Modes {
    type Output = Modes;
    fn bitor(self, rhs: Modes) -> Modes {
        Modes {
            long64: self.long64 || rhs.long64,
            prot32: self.prot32 || rhs.prot32,
        }
    }
}

/// One encoding alternative for a mnemonic.
#[derive(Clone, Debug)]
pub struct Row {
    /// The operand signature, one slot per operand.
    pub sig: &'static [OperandSig],
    /// How operands map into fields.
    pub open: OpEn,
    /// Mandatory 0x66 operand-size prefix (16-bit operand forms).
    pub prefix66: bool,
    /// The opcode bytes (1-3).
    pub opcode: SmallVec<[u8; 3]>,
    /// The `/digit` opcode extension carried in the ModR/M reg field.
    pub digit: Option<u8>,
    /// REX.W is required.
    pub rex_w: bool,
    /// In 64-bit mode the operand size defaults to 64 bits without REX.W
    /// (push/pop/call/jmp-near).
    pub default64: bool,
    /// Mode legality.
    pub modes: Modes,
}

impl Row {
    /// The width of the immediate this row appends, if any.
    pub fn imm_width(&self) -> Option<Width> {
        use OperandSig::*;
        self.sig.iter().find_map(|s| match s {
            imm8 | sximm8 => Some(Width::Byte),
            imm16 => Some(Width::Word),
            imm32 | sximm32 => Some(Width::Dword),
            imm64 => Some(Width::Qword),
            _ => None,
        })
    }

    /// The relative-displacement width for `D` rows.
    pub fn rel_width(&self) -> Option<Width> {
        self.sig.iter().find_map(|s| match s {
            OperandSig::rel8 => Some(Width::Byte),
            OperandSig::rel32 => Some(Width::Dword),
            _ => None,
        })
    }

    /// Whether the row is legal under `mode`.
    pub fn legal_in(&self, mode: crate::mode::Mode) -> bool {
        if mode.is_64() {
            self.modes.long64
        } else {
            self.modes.prot32
        }
    }
}

/// A format: the operand-encoding tag plus the signature slots.
pub(crate) struct Fmt {
    open: OpEn,
    sig: &'static [OperandSig],
}

/// Abbreviated constructor for a format, mirroring the reference's
/// "Op/En" and "Instruction" columns.
pub(crate) fn fmt(open: OpEn, sig: &'static [OperandSig]) -> Fmt {
    Fmt { open, sig }
}

/// Builder for the encoding column of a row.
pub(crate) struct Enc {
    prefix66: bool,
    opcode: SmallVec<[u8; 3]>,
    w: bool,
    digit: Option<u8>,
    imm_bytes: Option<u8>,
    default64: bool,
}

/// Sources accepted by [`rex`]: a single opcode byte or a short byte list
/// whose leading 0x66 is the mandatory operand-size prefix.
pub(crate) trait IntoOpcodes {
    fn into_opcodes(self) -> (bool, SmallVec<[u8; 3]>);
}

impl IntoOpcodes for u8 {
    fn into_opcodes(self) -> (bool, SmallVec<[u8; 3]>) {
        (false, SmallVec::from_slice(&[self]))
    }
}

impl<const N: usize> IntoOpcodes for [u8; N] {
    fn into_opcodes(self) -> (bool, SmallVec<[u8; 3]>) {
        match self.split_first() {
            Some((&0x66, rest)) if !rest.is_empty() => (true, SmallVec::from_slice(rest)),
            _ => (false, SmallVec::from_slice(&self)),
        }
    }
}

/// Abbreviated constructor for a legacy/REX-encoded row.
pub(crate) fn rex(opcode: impl IntoOpcodes) -> Enc {
    let (prefix66, opcode) = opcode.into_opcodes();
    Enc {
        prefix66,
        opcode,
        w: false,
        digit: None,
        imm_bytes: None,
        default64: false,
    }
}

impl Enc {
    /// Set the REX.W bit.
    pub(crate) fn w(mut self) -> Self {
        self.w = true;
        self
    }

    /// Set the `/digit` opcode extension.
    pub(crate) fn digit(mut self, digit: u8) -> Self {
        assert!(digit < 8);
        self.digit = Some(digit);
        self
    }

    /// Append a 1-byte immediate (`ib`).
    pub(crate) fn ib(mut self) -> Self {
        assert_eq!(self.imm_bytes, None);
        self.imm_bytes = Some(1);
        self
    }

    /// Append a 2-byte immediate (`iw`).
    pub(crate) fn iw(mut self) -> Self {
        assert_eq!(self.imm_bytes, None);
        self.imm_bytes = Some(2);
        self
    }

    /// Append a 4-byte immediate (`id`).
    pub(crate) fn id(mut self) -> Self {
        assert_eq!(self.imm_bytes, None);
        self.imm_bytes = Some(4);
        self
    }

    /// Append an 8-byte immediate (`io`).
    pub(crate) fn io(mut self) -> Self {
        assert_eq!(self.imm_bytes, None);
        self.imm_bytes = Some(8);
        self
    }

    /// Mark the operand size as defaulting to 64 bits in long mode.
    pub(crate) fn d64(mut self) -> Self {
        self.default64 = true;
        self
    }
}

/// One table entry: a mnemonic plus a row.
pub(crate) struct InstSpec {
    pub(crate) mnemonic: &'static str,
    pub(crate) row: Row,
}

/// Assemble a table entry; `insts/` files are lists of these.
pub(crate) fn inst(mnemonic: &'static str, format: Fmt, enc: Enc, modes: Modes) -> InstSpec {
    let row = Row {
        sig: format.sig,
        open: format.open,
        prefix66: enc.prefix66,
        opcode: enc.opcode,
        digit: enc.digit,
        rex_w: enc.w,
        default64: enc.default64,
        modes,
    };
    // The `ib`/`iw`/`id`/`io` markers repeat what the signature already says;
    // make sure a transcription mistake cannot leave them disagreeing.
    if let Some(bytes) = enc.imm_bytes {
        let sig_imm = row
            .imm_width()
            .or_else(|| row.rel_width())
            .map(|w| w.bytes() as u8);
        assert_eq!(
            sig_imm,
            Some(bytes),
            "{mnemonic}: immediate marker disagrees with signature"
        );
    }
    InstSpec { mnemonic, row }
}

/// The mnemonic-keyed table, built once and shared process-wide.
static TABLE: Lazy<HashMap<&'static str, Vec<Row>>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Vec<Row>> = HashMap::new();
    for spec in insts::list() {
        map.entry(spec.mnemonic).or_default().push(spec.row);
    }
    map
});

/// The ordered encoding rows for `mnemonic`, if it is known.
pub fn rows(mnemonic: &str) -> Option<&'static [Row]> {
    TABLE.get(mnemonic).map(|v| v.as_slice())
}

/// Whether `op` satisfies signature slot `sig` in a row whose register slots
/// anchor the widths in `anchors`.
fn operand_matches(sig: OperandSig, op: &Operand, ctx: &AsmCtx, anchors: &[Width]) -> bool {
    use OperandSig::*;
    match sig {
        al => op.as_reg() == Some(AL),
        cl => op.as_reg() == Some(CL),
        ax => op.as_reg() == Some(AX),
        eax => op.as_reg() == Some(EAX),
        rax => op.as_reg() == Some(RAX),
        one => matches!(op, Operand::Imm(1)),
        r8 | r16 | r32 | r64 => match op.as_reg() {
            Some(r) => r.class() == RegClass::Gpr && Some(r.width()) == sig.width(),
            None => false,
        },
        rm8 | rm16 | rm32 | rm64 => match op {
            Operand::Reg(r) => r.class() == RegClass::Gpr && Some(r.width()) == sig.width(),
            Operand::Mem(mem) => match mem.operand_width() {
                Some(w) => Some(w) == sig.width(),
                // An unsized memory operand is acceptable only when a
                // register elsewhere in the row pins the same width.
                None => sig.width().is_some_and(|w| anchors.contains(&w)),
            },
            _ => false,
        },
        m => matches!(op, Operand::Mem(_)),
        imm8 => matches!(op, Operand::Imm(v) if (-0x80..=0xFF).contains(v)),
        imm16 => matches!(op, Operand::Imm(v) if (-0x8000..=0xFFFF).contains(v)),
        imm32 => match op {
            Operand::Imm(v) => (-(1i64 << 31)..(1i64 << 32)).contains(v),
            // A label as an immediate reserves a pointer-sized slot.
            Operand::Label(_) => ctx.mode.pointer_width() == Width::Dword,
            _ => false,
        },
        imm64 => match op {
            Operand::Imm(_) => true,
            Operand::Label(_) => ctx.mode.pointer_width() == Width::Qword,
            _ => false,
        },
        sximm8 => matches!(op, Operand::Imm(v) if i8::try_from(*v).is_ok()),
        sximm32 => matches!(op, Operand::Imm(v) if i32::try_from(*v).is_ok()),
        rel8 => match op {
            Operand::Label(_) => true,
            Operand::Imm(v) => i8::try_from(*v).is_ok(),
            _ => false,
        },
        rel32 => match op {
            Operand::Label(_) => true,
            Operand::Imm(v) => i32::try_from(*v).is_ok(),
            _ => false,
        },
        moffs => false,
        xmm => matches!(op, Operand::Reg(r) if r.class() == RegClass::Xmm),
        xmm_m128 => match op {
            Operand::Reg(r) => r.class() == RegClass::Xmm,
            Operand::Mem(mem) => mem.operand_width() == Some(Width::Oword),
            _ => false,
        },
        st => matches!(op, Operand::Reg(r) if r.class() == RegClass::St),
    }
}

/// Whether `row` accepts the whole operand tuple.
pub(crate) fn row_matches(row: &Row, ops: &[Operand], ctx: &AsmCtx) -> bool {
    if row.sig.len() != ops.len() || !row.legal_in(ctx.mode) {
        return false;
    }
    let anchors: SmallVec<[Width; 3]> = row
        .sig
        .iter()
        .filter(|s| s.is_reg_anchor())
        .filter_map(|s| s.width())
        .collect();
    row.sig
        .iter()
        .zip(ops)
        .all(|(sig, op)| operand_matches(*sig, op, ctx, &anchors))
}

/// The length in bytes of the ModR/M + SIB + displacement group for a memory
/// operand.
pub(crate) fn mem_encoding_len(mem: &Mem, ctx: &AsmCtx) -> u32 {
    let (base, index) = (mem.base_reg(), mem.index_reg());
    let mut disp = Disp::new(mem.disp_value());
    match (base, index) {
        (None, None) => {
            // Absolute disp32; long mode needs the SIB escape to avoid the
            // RIP-relative encoding.
            if ctx.mode.is_64() {
                1 + 1 + 4
            } else {
                1 + 4
            }
        }
        (Some(base), None) => {
            if base.enc() & 7 == 5 {
                disp.force_disp8();
            }
            let sib = u32::from(base.enc() & 7 == 4);
            1 + sib + disp.len()
        }
        (_, Some(_)) => {
            match base {
                Some(base) => {
                    if base.enc() & 7 == 5 {
                        disp.force_disp8();
                    }
                    1 + 1 + disp.len()
                }
                // Index without base: disp32 is mandatory.
                None => 1 + 1 + 4,
            }
        }
    }
}

/// The total encoded length of `row` applied to `ops`.
pub(crate) fn encoded_len(row: &Row, ops: &[Operand], ctx: &AsmCtx, lock: bool) -> u32 {
    let mem = ops.iter().find_map(|op| op.as_mem());
    let mut len = 0u32;
    if let Some(mem) = mem {
        if mem.seg_override().is_some() {
            len += 1;
        }
        if ctx.mode.is_64() && mem.address_width(ctx.mode) == Width::Dword {
            len += 1; // 0x67
        }
    }
    if lock {
        len += 1;
    }
    if row.prefix66 {
        len += 1;
    }
    if ctx.mode.is_64() && rex_needed(row, ops) {
        len += 1;
    }
    len += row.opcode.len() as u32;
    if row.open.has_modrm() {
        match mem {
            Some(mem) => len += mem_encoding_len(mem, ctx),
            None => len += 1, // mod=11, no SIB, no displacement
        }
    }
    if let Some(w) = row.imm_width() {
        len += w.bytes();
    }
    if let Some(w) = row.rel_width() {
        len += w.bytes();
    }
    len
}

/// Whether encoding `row` with `ops` produces a REX byte (64-bit mode only).
pub(crate) fn rex_needed(row: &Row, ops: &[Operand]) -> bool {
    if row.rex_w {
        return true;
    }
    for op in ops {
        match op {
            Operand::Reg(r) => {
                if r.is_extended() || r.needs_rex_for_byte() {
                    return true;
                }
            }
            Operand::Mem(mem) => {
                for r in [mem.base_reg(), mem.index_reg()].into_iter().flatten() {
                    if r.is_extended() {
                        return true;
                    }
                }
            }
            _ => {}
        }
    }
    false
}

/// Select the encoding row for a concrete operand tuple.
///
/// Rows are scanned in declaration order; by default the shortest matching
/// encoding wins with declaration order as the tie-break, and under
/// `strict_parity` the first match wins outright.
pub(crate) fn select(
    mnemonic: &str,
    ops: &[Operand],
    ctx: &AsmCtx,
    lock: bool,
) -> AsmResult<&'static Row> {
    let rows = rows(mnemonic).ok_or_else(|| AsmError::UnknownMnemonic(mnemonic.to_string()))?;
    let mut best: Option<(&Row, u32)> = None;
    let mut imm_misses: Option<(usize, u8)> = None;
    for row in rows {
        if !row_matches(row, ops, ctx) {
            if let Some((index, value, bits)) = immediate_only_mismatch(row, ops, ctx) {
                log::trace!("{mnemonic}: imm {value} misses {bits}-bit row");
                let widest = imm_misses.map_or(0, |(_, b)| b);
                if bits > widest {
                    imm_misses = Some((index, bits));
                }
            }
            continue;
        }
        let len = encoded_len(row, ops, ctx, lock);
        log::trace!("{mnemonic}: row {:02x?} matches, {len} bytes", row.opcode);
        if ctx.flags.strict_parity() {
            return Ok(row);
        }
        match best {
            Some((_, best_len)) if best_len <= len => {}
            _ => best = Some((row, len)),
        }
    }
    match best {
        Some((row, _)) => Ok(row),
        None => {
            if let Some((index, bits)) = imm_misses {
                if let Some(Operand::Imm(value)) = ops.get(index) {
                    return Err(AsmError::ImmediateOutOfRange {
                        mnemonic: mnemonic.to_string(),
                        index,
                        value: *value,
                        width: bits,
                    });
                }
            }
            let given = ops
                .iter()
                .map(|o| o.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let tried = rows
                .iter()
                .map(|r| {
                    let sig = r
                        .sig
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({sig})")
                })
                .collect::<Vec<_>>()
                .join("; ");
            Err(AsmError::NoMatchingForm {
                mnemonic: mnemonic.to_string(),
                given,
                tried,
            })
        }
    }
}

/// If `row` was rejected solely because an immediate operand does not fit its
/// immediate slot, report (operand index, value, slot width in bits).
fn immediate_only_mismatch(row: &Row, ops: &[Operand], ctx: &AsmCtx) -> Option<(usize, i64, u8)> {
    use OperandSig::*;
    if row.sig.len() != ops.len() || !row.legal_in(ctx.mode) {
        return None;
    }
    let anchors: SmallVec<[Width; 3]> = row
        .sig
        .iter()
        .filter(|s| s.is_reg_anchor())
        .filter_map(|s| s.width())
        .collect();
    let mut miss = None;
    for (index, (sig, op)) in row.sig.iter().zip(ops).enumerate() {
        if operand_matches(*sig, op, ctx, &anchors) {
            continue;
        }
        match (sig, op) {
            (imm8 | imm16 | imm32 | imm64 | sximm8 | sximm32, Operand::Imm(v)) if miss.is_none() => {
                let bits = match sig {
                    imm8 | sximm8 => 8,
                    imm16 => 16,
                    imm32 | sximm32 => 32,
                    _ => 64,
                };
                miss = Some((index, *v, bits));
            }
            _ => return None,
        }
    }
    miss
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    #[test]
    fn table_is_well_formed() {
        for (mnemonic, rows) in TABLE.iter() {
            for row in rows {
                assert!(
                    row.modes.long64 || row.modes.prot32,
                    "{mnemonic}: row legal nowhere"
                );
                if row.open.has_modrm() {
                    assert!(
                        row.sig.iter().any(|s| matches!(
                            s,
                            OperandSig::rm8
                                | OperandSig::rm16
                                | OperandSig::rm32
                                | OperandSig::rm64
                                | OperandSig::m
                                | OperandSig::xmm_m128
                        )) || matches!(row.open, OpEn::RM | OpEn::MR | OpEn::RMI),
                        "{mnemonic}: ModR/M row without an r/m slot"
                    );
                }
                if matches!(row.open, OpEn::M | OpEn::MI) {
                    assert!(row.digit.is_some(), "{mnemonic}: /digit row without digit");
                }
                if row.rex_w {
                    assert!(row.modes.long64 && !row.modes.prot32, "{mnemonic}: REX.W row must be 64-bit only");
                }
            }
        }
    }

    #[test]
    fn unknown_mnemonic() {
        let ctx = AsmCtx::new(Mode::Long64);
        assert!(matches!(
            select("frobnicate", &[], &ctx, false),
            Err(AsmError::UnknownMnemonic(_))
        ));
    }
}

//! The assembly unit: an ordered stream of instructions and label
//! definitions, resolved in two passes.
//!
//! Pass 1 assigns every size-variable branch its longest form, then
//! repeatedly re-walks the unit shrinking any branch whose resolved
//! displacement fits a shorter form. Sizes only ever decrease, so the walk
//! converges; the iteration count is capped at the number of size-variable
//! instructions as a backstop. Pass 2 emits bytes, computing each relative
//! displacement as `target - (offset + len)` and recording an absolute
//! relocation for every label used as an address immediate.

use std::collections::HashMap;

use crate::error::{AsmError, AsmResult};
use crate::inst::Inst;
use crate::mode::Mode;
use crate::reg::Width;
use crate::settings::{AsmCtx, Flags};
use crate::sink::CodeOffset;

/// One entry of an assembly unit.
pub enum Entry {
    /// An instruction.
    Inst(Inst),
    /// A label definition anchored at the next instruction's offset.
    Label(String),
}

/// An absolute-address relocation: once the load base is known, the value
/// `base + target` is patched into the `width`-sized slot at `at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbsReloc {
    /// Offset of the immediate slot in the emitted bytes.
    pub at: CodeOffset,
    /// Width of the slot; matches the unit's pointer width.
    pub width: Width,
    /// Offset of the referenced label.
    pub target: CodeOffset,
}

/// The finished product of a unit: bytes, the resolved label table, and any
/// absolute relocations still awaiting a base address.
#[derive(Debug)]
pub struct Output {
    /// The emitted machine code.
    pub bytes: Vec<u8>,
    /// Every label's resolved offset.
    pub labels: HashMap<String, CodeOffset>,
    /// Absolute-address slots to patch at load time.
    pub relocs: Vec<AbsReloc>,
    /// The mode the unit was assembled for.
    pub mode: Mode,
}

impl Output {
    /// The resolved offset of `name`, if it was defined.
    pub fn label_offset(&self, name: &str) -> Option<CodeOffset> {
        self.labels.get(name).copied()
    }

    /// Patch all absolute relocations against `base`, the address the bytes
    /// will live at.
    pub fn relocate(&mut self, base: u64) -> AsmResult<()> {
        for reloc in &self.relocs {
            let value = base.wrapping_add(u64::from(reloc.target));
            let at = reloc.at as usize;
            match reloc.width {
                Width::Dword => {
                    let value = u32::try_from(value)
                        .map_err(|_| AsmError::DisplacementOutOfRange(value as i64))?;
                    self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
                }
                Width::Qword => {
                    self.bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
                }
                _ => unreachable!("relocation width is always pointer-sized"),
            }
        }
        Ok(())
    }
}

/// An assembly unit under construction.
pub struct Unit {
    ctx: AsmCtx,
    entries: Vec<Entry>,
    /// Label name -> index into `entries`, for duplicate detection; offsets
    /// are computed during resolution.
    defined: HashMap<String, usize>,
}

impl Unit {
    /// An empty unit for `mode` with default flags.
    pub fn new(mode: Mode) -> Self {
        Self::with_flags(mode, Flags::default())
    }

    /// An empty unit with explicit flags.
    pub fn with_flags(mode: Mode, flags: Flags) -> Self {
        Self {
            ctx: AsmCtx::with_flags(mode, flags),
            entries: Vec::new(),
            defined: HashMap::new(),
        }
    }

    /// The context instructions for this unit must be built with.
    pub fn ctx(&self) -> &AsmCtx {
        &self.ctx
    }

    /// Append an instruction. The instruction must have been validated under
    /// the same mode as this unit.
    pub fn push(&mut self, inst: Inst) -> AsmResult<()> {
        if inst.mode() != self.ctx.mode {
            return Err(AsmError::ArchMismatch {
                what: format!("`{inst}` assembled for {} mode", inst.mode()),
                mode: self.ctx.mode,
            });
        }
        self.entries.push(Entry::Inst(inst));
        Ok(())
    }

    /// Build and append an instruction in one step.
    pub fn emit(
        &mut self,
        mnemonic: &str,
        operands: &[crate::operand::Operand],
    ) -> AsmResult<()> {
        let inst = Inst::new(mnemonic, operands, &self.ctx)?;
        self.entries.push(Entry::Inst(inst));
        Ok(())
    }

    /// Define `name` at the current position.
    pub fn define_label(&mut self, name: &str) -> AsmResult<()> {
        if self.defined.contains_key(name) {
            return Err(AsmError::DuplicateLabel(name.to_string()));
        }
        self.defined.insert(name.to_string(), self.entries.len());
        self.entries.push(Entry::Label(name.to_string()));
        Ok(())
    }

    /// Number of entries pushed so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the unit is still empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve sizes and emit. Consumes the unit.
    pub fn assemble(mut self) -> AsmResult<Output> {
        self.resolve()?;
        let labels = self.final_offsets();
        let mut bytes = Vec::new();
        let mut relocs = Vec::new();
        for entry in &self.entries {
            let inst = match entry {
                Entry::Inst(inst) => inst,
                Entry::Label(_) => continue,
            };
            let offset = bytes.len() as CodeOffset;
            let len = inst.len(&self.ctx);
            let rel = match inst.branch_label() {
                Some(name) => {
                    let target = *labels
                        .get(name)
                        .ok_or_else(|| AsmError::UndefinedLabel(name.to_string()))?;
                    Some(i64::from(target) - i64::from(offset + len))
                }
                None => None,
            };
            if let Some(name) = inst.abs_label() {
                if !labels.contains_key(name) {
                    return Err(AsmError::UndefinedLabel(name.to_string()));
                }
            }
            let slot = inst.encode_into(&mut bytes, &self.ctx, rel)?;
            debug_assert_eq!(
                bytes.len() as CodeOffset,
                offset + len,
                "emitted length disagrees with computed length for `{inst}`"
            );
            if let (Some((at, width)), Some(name)) = (slot, inst.abs_label()) {
                relocs.push(AbsReloc {
                    at,
                    width,
                    target: labels[name],
                });
            }
        }
        Ok(Output {
            bytes,
            labels,
            relocs,
            mode: self.ctx.mode,
        })
    }

    /// Pass 1: shrink size-variable branches until nothing changes.
    ///
    /// Label offsets recorded in earlier iterations are used for forward
    /// references; since sizes only decrease, a displacement that fits a
    /// short form against stale offsets still fits once later shrinks pull
    /// the code closer together.
    fn resolve(&mut self) -> AsmResult<()> {
        let ctx = self.ctx;
        let variable = self
            .entries
            .iter()
            .filter(|e| matches!(e, Entry::Inst(i) if i.is_size_variable()))
            .count();
        let mut label_offsets: HashMap<String, CodeOffset> = HashMap::new();

        // Worst case: one pass to place the labels, one shrink per
        // size-variable instruction, one clean pass to detect the fixpoint.
        let max_iterations = variable + 2;
        let mut iterations = 0usize;
        let mut go_again = true;
        while go_again {
            go_again = false;
            let mut offset: CodeOffset = 0;
            for entry in &mut self.entries {
                match entry {
                    Entry::Label(name) => {
                        if label_offsets.get(name.as_str()) != Some(&offset) {
                            label_offsets.insert(name.clone(), offset);
                            go_again = true;
                        }
                    }
                    Entry::Inst(inst) => {
                        if inst.is_size_variable() {
                            let target = inst
                                .branch_label()
                                .and_then(|name| label_offsets.get(name))
                                .copied();
                            // Evaluate the displacement as if the shorter form
                            // were already in use.
                            if let (Some(target), Some(short_len)) =
                                (target, inst.shorter_len(&ctx))
                            {
                                let disp = i64::from(target) - i64::from(offset + short_len);
                                if inst.shrink(disp) {
                                    log::debug!(
                                        "shrinking `{inst}` at {offset:#x} for target {target:#x}"
                                    );
                                    go_again = true;
                                }
                            }
                        }
                        offset += inst.len(&ctx);
                    }
                }
            }
            iterations += 1;
            if iterations > max_iterations {
                debug_assert!(false, "branch shrinking failed to converge");
                break;
            }
        }
        Ok(())
    }

    /// The stable label offsets of a resolved unit.
    fn final_offsets(&self) -> HashMap<String, CodeOffset> {
        let mut labels = HashMap::new();
        let mut offset: CodeOffset = 0;
        for entry in &self.entries {
            match entry {
                Entry::Label(name) => {
                    labels.insert(name.clone(), offset);
                }
                Entry::Inst(_) => offset += entry.byte_len(&self.ctx),
            }
        }
        labels
    }
}

impl Entry {
    fn byte_len(&self, ctx: &AsmCtx) -> CodeOffset {
        match self {
            Entry::Inst(inst) => inst.len(ctx),
            Entry::Label(_) => 0,
        }
    }
}

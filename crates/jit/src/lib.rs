//! Executable code pages for the anvil assembler.
//!
//! Takes the [`Output`](anvil_asm::Output) of an assembled unit, places it in
//! page-aligned executable memory (patching absolute-address relocations
//! against the final base), and hands back [`Callable`] entry points. A page
//! lives for as long as its handle or any callable derived from it; dropping
//! the last one releases the memory.
//!
//! ```no_run
//! use anvil_asm::{Mode, Operand, Unit};
//! use anvil_asm::reg::EAX;
//! use anvil_jit::{CallConv, CodePage};
//!
//! let mut unit = Unit::new(Mode::Long64);
//! unit.emit("mov", &[EAX.into(), Operand::Imm(42)])?;
//! unit.emit("ret", &[])?;
//! let page = CodePage::new(unit.assemble()?, CallConv::SystemV)?;
//! let f: extern "sysv64" fn() -> i32 = unsafe { page.callable().cast() };
//! assert_eq!(f(), 42);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod code;
mod memory;

use thiserror::Error;

pub use code::{live_page_count, CallConv, Callable, CodePage};

/// An error raised while placing code into executable memory.
#[derive(Debug, Error)]
pub enum JitError {
    /// The operating system refused the allocation.
    #[error("the operating system refused executable memory")]
    PageAllocFailed(#[source] std::io::Error),

    /// Changing page protection failed.
    #[error("failed to change page protection: {0}")]
    Protect(String),

    /// A label requested as an entry point does not exist in the page.
    #[error("label `{0}` is not defined in this code page")]
    UnknownLabel(String),

    /// Resolution or relocation failed.
    #[error(transparent)]
    Asm(#[from] anvil_asm::AsmError),
}

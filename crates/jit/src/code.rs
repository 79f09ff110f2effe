//! Finalized code pages and the callable handles into them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use once_cell::sync::Lazy;
use target_lexicon::{CallingConvention, Triple};

use anvil_asm::{CodeOffset, Output};

use crate::memory::PagePtr;
use crate::JitError;

/// Calling convention identifiers for the emitted functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// System V AMD64, used on most 64-bit Unix platforms.
    SystemV,
    /// The Microsoft x64 convention.
    WindowsFastcall,
    /// 32-bit cdecl: caller cleans the stack.
    Cdecl,
    /// 32-bit stdcall: callee cleans the stack.
    Stdcall,
}

impl CallConv {
    /// The default calling convention for `triple`.
    pub fn triple_default(triple: &Triple) -> Self {
        match triple.default_calling_convention() {
            // Default to System V for unknown targets because most everything
            // uses System V.
            Ok(CallingConvention::SystemV) | Err(()) => Self::SystemV,
            Ok(CallingConvention::WindowsFastcall) => Self::WindowsFastcall,
            Ok(_) => Self::SystemV,
        }
    }

    /// The default calling convention for the host.
    pub fn host_default() -> Self {
        Self::triple_default(&Triple::host())
    }
}

/// A finalized, executable allocation. Kept alive by the `Arc` shared
/// between the page handle and every [`Callable`] into it; the memory is
/// released when the last of them drops.
struct FinalizedPage {
    mem: PagePtr,
    code_len: usize,
}

/// One assembly unit placed into executable memory.
pub struct CodePage {
    page: Arc<FinalizedPage>,
    labels: HashMap<String, CodeOffset>,
    call_conv: CallConv,
}

impl CodePage {
    /// Allocate executable memory for `output`, patch its absolute
    /// relocations against the chosen base, and publish it read+execute.
    ///
    /// The tail of the last page is padded with 0xCC so a fall-through off
    /// the end traps instead of executing whatever the allocator left there.
    pub fn new(mut output: Output, call_conv: CallConv) -> Result<CodePage, JitError> {
        let code_len = output.bytes.len();
        let mut mem = PagePtr::allocate(code_len.max(1))?;
        let base = mem.as_ptr() as u64;
        output.relocate(base)?;
        unsafe {
            std::ptr::copy_nonoverlapping(output.bytes.as_ptr(), mem.as_mut_ptr(), code_len);
            std::ptr::write_bytes(mem.as_mut_ptr().add(code_len), 0xCC, mem.len() - code_len);
        }
        mem.make_executable()?;
        log::debug!("published {code_len:#x} bytes of code at {base:#x}");
        let page = Arc::new(FinalizedPage { mem, code_len });
        registry().lock().unwrap().push(Arc::downgrade(&page));
        Ok(CodePage {
            page,
            labels: output.labels,
            call_conv,
        })
    }

    /// The base address of the page.
    pub fn base(&self) -> *const u8 {
        self.page.mem.as_ptr()
    }

    /// The number of meaningful code bytes (excluding trap padding).
    pub fn code_len(&self) -> usize {
        self.page.code_len
    }

    /// The calling convention the page was declared with.
    pub fn call_conv(&self) -> CallConv {
        self.call_conv
    }

    /// A callable at the start of the page.
    pub fn callable(&self) -> Callable {
        Callable {
            page: Arc::clone(&self.page),
            ptr: self.page.mem.as_ptr(),
            call_conv: self.call_conv,
        }
    }

    /// A callable at a named label inside the page.
    pub fn callable_at(&self, label: &str) -> Result<Callable, JitError> {
        let offset = self
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| JitError::UnknownLabel(label.to_string()))?;
        Ok(Callable {
            page: Arc::clone(&self.page),
            ptr: unsafe { self.page.mem.as_ptr().add(offset as usize) },
            call_conv: self.call_conv,
        })
    }
}

/// A shared, non-owning view into a [`CodePage`] that keeps the page's
/// memory alive for as long as the handle exists.
#[derive(Clone)]
pub struct Callable {
    page: Arc<FinalizedPage>,
    ptr: *const u8,
    call_conv: CallConv,
}

// The page is immutable and executable once published.
unsafe impl Send for Callable {}
unsafe impl Sync for Callable {}

impl Callable {
    /// The entry address.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// The calling convention the caller declared for this entry point.
    pub fn call_conv(&self) -> CallConv {
        self.call_conv
    }

    /// Reinterpret the entry address as a typed function pointer.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type whose signature and ABI match the
    /// machine code behind this handle, e.g. `extern "sysv64" fn(i64) -> i64`
    /// for a [`CallConv::SystemV`] entry. Calling through a mismatched type
    /// is undefined behavior.
    pub unsafe fn cast<F: Copy>(&self) -> F {
        assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*const u8>(),
            "cast target must be a function pointer"
        );
        std::mem::transmute_copy(&self.ptr)
    }

    fn page_base(&self) -> *const u8 {
        self.page.mem.as_ptr()
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("ptr", &self.ptr)
            .field("page", &self.page_base())
            .field("call_conv", &self.call_conv)
            .finish()
    }
}

/// Process-wide bookkeeping of live pages; `Weak` entries, so the registry
/// never extends a page's lifetime.
fn registry() -> &'static Mutex<Vec<Weak<FinalizedPage>>> {
    static PAGES: Lazy<Mutex<Vec<Weak<FinalizedPage>>>> = Lazy::new(|| Mutex::new(Vec::new()));
    &PAGES
}

/// The number of code pages currently alive in this process.
pub fn live_page_count() -> usize {
    let mut pages = registry().lock().unwrap();
    pages.retain(|p| p.strong_count() > 0);
    pages.len()
}

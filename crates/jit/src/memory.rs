//! Page-granular memory for generated code.
//!
//! Pages are allocated read+write, filled, and then flipped to read+execute;
//! write and execute permissions are never held together once code is
//! published.

use crate::JitError;

/// An owned, page-aligned allocation.
pub(crate) struct PagePtr {
    ptr: *mut u8,
    len: usize,
}

// The allocation is exclusively owned and the pointer never escapes without
// going through the page's lifetime management.
unsafe impl Send for PagePtr {}
unsafe impl Sync for PagePtr {}

impl PagePtr {
    /// Allocate at least `size` bytes of read+write memory, rounded up to
    /// whole pages.
    pub(crate) fn allocate(size: usize) -> Result<PagePtr, JitError> {
        let page_size = region::page::size();
        let len = size
            .checked_add(page_size - 1)
            .expect("allocation size overflow")
            & !(page_size - 1);
        let len = len.max(page_size);
        log::debug!("allocating {len:#x} bytes of code memory");
        Self::allocate_rw(len)
    }

    #[cfg(unix)]
    fn allocate_rw(len: usize) -> Result<PagePtr, JitError> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(JitError::PageAllocFailed(std::io::Error::last_os_error()));
        }
        Ok(PagePtr {
            ptr: ptr.cast(),
            len,
        })
    }

    #[cfg(windows)]
    fn allocate_rw(len: usize) -> Result<PagePtr, JitError> {
        use windows_sys::Win32::System::Memory::{
            VirtualAlloc, MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE,
        };
        let ptr = unsafe {
            VirtualAlloc(
                std::ptr::null(),
                len,
                MEM_COMMIT | MEM_RESERVE,
                PAGE_READWRITE,
            )
        };
        if ptr.is_null() {
            return Err(JitError::PageAllocFailed(std::io::Error::last_os_error()));
        }
        Ok(PagePtr {
            ptr: ptr.cast(),
            len,
        })
    }

    /// Revoke write permission and allow execution.
    pub(crate) fn make_executable(&self) -> Result<(), JitError> {
        unsafe { region::protect(self.ptr, self.len, region::Protection::ReadExecute) }
            .map_err(|e| JitError::Protect(e.to_string()))
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for PagePtr {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            libc::munmap(self.ptr.cast(), self.len);
        }
        #[cfg(windows)]
        unsafe {
            use windows_sys::Win32::System::Memory::{VirtualFree, MEM_RELEASE};
            VirtualFree(self.ptr.cast(), 0, MEM_RELEASE);
        }
    }
}

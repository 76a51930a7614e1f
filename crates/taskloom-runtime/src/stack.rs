//! Guard-paged routine stacks
//!
//! Each routine owns one mmap'd stack with a PROT_NONE guard page at the
//! low end, so runaway recursion faults instead of silently corrupting a
//! neighbouring allocation.

use taskloom_core::error::{SchedError, SchedResult};

#[cfg(not(unix))]
compile_error!("taskloom routine stacks require a unix mmap");

/// Page size assumed for guard layout
const PAGE_SIZE: usize = 4096;

/// Default usable stack size per routine (256 KB)
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Smallest usable stack accepted (16 KB)
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// An owned, guard-paged stack mapping.
///
/// Layout, low to high: one guard page, then `size` usable bytes.
/// The mapping is released on drop.
pub struct RoutineStack {
    base: *mut u8,
    total: usize,
}

// The raw base pointer is only ever dereferenced by the routine running
// on this stack, which is owned by exactly one processor at a time.
unsafe impl Send for RoutineStack {}
unsafe impl Sync for RoutineStack {}

impl RoutineStack {
    /// Map a new stack with `size` usable bytes (rounded up to whole
    /// pages) below a guard page.
    pub fn new(size: usize) -> SchedResult<Self> {
        let size = size.max(MIN_STACK_SIZE);
        let usable = (size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
        let total = usable + PAGE_SIZE;

        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                total,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(SchedError::StackAlloc(size));
        }

        // Guard page at the low end
        let rc = unsafe { libc::mprotect(base, PAGE_SIZE, libc::PROT_NONE) };
        if rc != 0 {
            unsafe { libc::munmap(base, total) };
            return Err(SchedError::StackAlloc(size));
        }

        Ok(Self {
            base: base as *mut u8,
            total,
        })
    }

    /// High end of the usable region; stacks grow down from here.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.add(self.total) }
    }

    /// Usable bytes between guard page and top
    #[inline]
    pub fn usable(&self) -> usize {
        self.total - PAGE_SIZE
    }
}

impl Drop for RoutineStack {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.total);
        }
    }
}

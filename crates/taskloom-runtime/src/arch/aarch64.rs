//! aarch64 context switching implementation
//!
//! TODO: implement for ARM64 (save x19-x28, fp, lr, sp and d8-d15 per
//! AAPCS64). The type layout is settled; only the assembly is missing.

/// Saved register block for a suspended flow of control.
#[repr(C)]
#[derive(Debug, Default)]
pub struct SavedContext {
    pub sp: u64,
    pub pc: u64,
    pub x19_x28: [u64; 10],
    pub fp: u64,
    pub lr: u64,
    pub d8_d15: [u64; 8],
}

impl SavedContext {
    pub const fn new() -> Self {
        Self {
            sp: 0,
            pc: 0,
            x19_x28: [0; 10],
            fp: 0,
            lr: 0,
            d8_d15: [0; 8],
        }
    }
}

/// Prepare a fresh context so that the first switch into it enters
/// `entry(arg)` on the given stack.
///
/// # Safety
///
/// `ctx` must point to valid `SavedContext` memory and `stack_top` must
/// be the high end of a live, writable stack.
pub unsafe fn init_context(
    _ctx: *mut SavedContext,
    _stack_top: *mut u8,
    _entry: extern "C" fn(usize),
    _arg: usize,
) {
    todo!("aarch64 init_context not yet implemented")
}

/// Save the current flow of control into `old` and resume `new`.
///
/// # Safety
///
/// Both pointers must be valid and `new` must be initialized.
pub unsafe extern "C" fn swap_context(_old: *mut SavedContext, _new: *const SavedContext) {
    todo!("aarch64 swap_context not yet implemented")
}

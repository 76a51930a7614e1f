//! Thread-local dispatch state
//!
//! Each processor thread records its id, its main context (the register
//! state of the dispatch loop itself) and the routine it is currently
//! resuming. `yield_now` and `block_current` use this to find their way
//! back to the dispatch loop.

use crate::arch::SavedContext;
use crate::routine::Routine;
use std::cell::Cell;

thread_local! {
    /// Processor id of this OS thread, usize::MAX off processor threads
    static PROCESSOR_ID: Cell<usize> = const { Cell::new(usize::MAX) };

    /// Register state of this thread's dispatch loop
    static MAIN_CONTEXT: Cell<*mut SavedContext> = const { Cell::new(std::ptr::null_mut()) };

    /// Routine currently resumed on this thread
    static CURRENT_ROUTINE: Cell<*const Routine> = const { Cell::new(std::ptr::null()) };
}

#[inline]
pub fn set_processor_id(id: usize) {
    PROCESSOR_ID.with(|cell| cell.set(id));
}

#[inline]
pub fn processor_id() -> Option<usize> {
    let id = PROCESSOR_ID.with(|cell| cell.get());
    if id == usize::MAX {
        None
    } else {
        Some(id)
    }
}

#[inline]
pub(crate) fn set_main_context(ctx: *mut SavedContext) {
    MAIN_CONTEXT.with(|cell| cell.set(ctx));
}

#[inline]
pub(crate) fn main_context() -> *mut SavedContext {
    MAIN_CONTEXT.with(|cell| cell.get())
}

#[inline]
pub(crate) fn clear_main_context() {
    MAIN_CONTEXT.with(|cell| cell.set(std::ptr::null_mut()));
}

#[inline]
pub(crate) fn set_current_routine(routine: *const Routine) {
    CURRENT_ROUTINE.with(|cell| cell.set(routine));
}

#[inline]
pub(crate) fn current_routine() -> *const Routine {
    CURRENT_ROUTINE.with(|cell| cell.get())
}

#[inline]
pub(crate) fn clear_current_routine() {
    CURRENT_ROUTINE.with(|cell| cell.set(std::ptr::null()));
}

/// Check if the caller is executing inside a routine
#[inline]
pub fn is_in_routine() -> bool {
    CURRENT_ROUTINE.with(|cell| !cell.get().is_null())
}

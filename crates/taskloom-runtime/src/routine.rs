//! Cooperative routines
//!
//! A routine is a unit of work with its own stack and saved register
//! state. It runs when a processor resumes it and keeps the CPU until it
//! yields, blocks or finishes; it is never preempted.

use crate::arch::{self, SavedContext};
use crate::stack::{RoutineStack, DEFAULT_STACK_SIZE};
use crate::tls;
use std::cell::UnsafeCell;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use taskloom_core::error::SchedResult;
use taskloom_core::id::RoutineId;
use taskloom_core::state::{Priority, RoutineState};
use tracing::{debug, error, warn};

type EntryFn = Box<dyn FnOnce() + Send + 'static>;

/// A cooperatively scheduled unit of work.
///
/// State transitions are driven by `resume` and by the yield/block calls
/// made from inside the routine; at most one processor drives them at any
/// instant. After every resume the observable state is `Ready`, `Blocked`
/// or `Finished`, never `Running`.
pub struct Routine {
    id: RoutineId,
    name: Option<String>,
    priority: Priority,
    state: AtomicU8,
    started: AtomicBool,
    force_stop: AtomicBool,
    wake_pending: AtomicBool,
    stack: RoutineStack,
    ctx: UnsafeCell<SavedContext>,
    entry: UnsafeCell<Option<EntryFn>>,
}

// `ctx` and `entry` are only touched by the processor currently resuming
// this routine; the queue/blocked-map handoff provides the ordering.
unsafe impl Send for Routine {}
unsafe impl Sync for Routine {}

impl Routine {
    /// Create a routine with the default stack size.
    pub fn new<F>(f: F) -> SchedResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_stack_size(f, DEFAULT_STACK_SIZE)
    }

    /// Create a routine with an explicit usable stack size.
    pub fn with_stack_size<F>(f: F, stack_size: usize) -> SchedResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Ok(Self {
            id: RoutineId::next(),
            name: None,
            priority: Priority::Normal,
            state: AtomicU8::new(RoutineState::Ready as u8),
            started: AtomicBool::new(false),
            force_stop: AtomicBool::new(false),
            wake_pending: AtomicBool::new(false),
            stack: RoutineStack::new(stack_size)?,
            ctx: UnsafeCell::new(SavedContext::new()),
            entry: UnsafeCell::new(Some(Box::new(f))),
        })
    }

    /// Attach a human-readable name for logging.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the priority consumed by the priority context strategy.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    pub fn id(&self) -> RoutineId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn state(&self) -> RoutineState {
        RoutineState::from(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: RoutineState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Mark the routine so its next resume forces `Finished` without
    /// entering user code. Used to drain queues at shutdown.
    pub fn stop(&self) {
        self.force_stop.store(true, Ordering::Release);
    }

    /// Latch a wake. If the routine is about to block, the latched wake
    /// cancels that block; the release path checks the latch too.
    pub(crate) fn request_wake(&self) {
        self.wake_pending.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn take_wake_pending(&self) -> bool {
        self.wake_pending.swap(false, Ordering::AcqRel)
    }

    /// Transfer control into the routine until it yields, blocks or
    /// finishes. Returns the post-resume state.
    ///
    /// Must not be called from inside another routine. Callers off a
    /// processor thread get a temporary main context so unit tests and
    /// inline execution work.
    pub fn resume(self: &Arc<Self>) -> RoutineState {
        if self.state().is_finished() {
            return RoutineState::Finished;
        }
        if self.force_stop.load(Ordering::Acquire) {
            self.set_state(RoutineState::Finished);
            return RoutineState::Finished;
        }
        if tls::is_in_routine() {
            error!(id = %self.id, "resume from inside a routine is not allowed");
            return self.state();
        }

        let mut local = SavedContext::new();
        let installed_main = tls::main_context().is_null();
        if installed_main {
            tls::set_main_context(&mut local);
        }
        let main = tls::main_context();

        unsafe {
            if !self.started.swap(true, Ordering::Relaxed) {
                arch::init_context(
                    self.ctx.get(),
                    self.stack.top(),
                    routine_entry,
                    Arc::as_ptr(self) as usize,
                );
            }
            self.set_state(RoutineState::Running);
            tls::set_current_routine(Arc::as_ptr(self));
            arch::swap_context(main, self.ctx.get());
            tls::clear_current_routine();
        }

        if installed_main {
            tls::clear_main_context();
        }
        self.state()
    }
}

impl Drop for Routine {
    fn drop(&mut self) {
        // A suspended routine's stack frames never unwind; their locals
        // leak. Accepted for force-stopped work.
        if self.started.load(Ordering::Relaxed) && !self.state().is_finished() {
            debug!(id = %self.id, "dropping suspended routine");
        }
    }
}

impl std::fmt::Debug for Routine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routine")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("state", &self.state())
            .finish()
    }
}

/// First frame of every routine stack. Runs the entry closure, contains
/// panics, then hands control back to the dispatch loop for good.
extern "C" fn routine_entry(ptr: usize) {
    let routine = unsafe { &*(ptr as *const Routine) };

    let entry = unsafe { (*routine.entry.get()).take() };
    if let Some(f) = entry {
        // A fault in user code must never leave the routine Running.
        if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            error!(id = %routine.id, name = routine.name(), "routine panicked");
        }
    } else {
        warn!(id = %routine.id, "routine entry already consumed");
    }

    routine.set_state(RoutineState::Finished);
    let main = tls::main_context();
    unsafe {
        arch::swap_context(routine.ctx.get(), main);
    }
    unreachable!("finished routine resumed");
}

/// Yield the current routine back to its processor, leaving it Ready for
/// a later resume. Off a routine this degrades to an OS-thread yield.
pub fn yield_now() {
    let cur = tls::current_routine();
    if cur.is_null() {
        std::thread::yield_now();
        return;
    }
    let routine = unsafe { &*cur };
    routine.set_state(RoutineState::Ready);
    let main = tls::main_context();
    unsafe {
        arch::swap_context(routine.ctx.get(), main);
    }
}

/// Park the current routine until an external wake. A wake latched while
/// the routine was still running cancels the park. No-op off a routine.
pub fn block_current() {
    let cur = tls::current_routine();
    if cur.is_null() {
        return;
    }
    let routine = unsafe { &*cur };
    if routine.take_wake_pending() {
        return;
    }
    routine.set_state(RoutineState::Blocked);
    let main = tls::main_context();
    unsafe {
        arch::swap_context(routine.ctx.get(), main);
    }
}

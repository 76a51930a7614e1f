//! Processor contexts
//!
//! A processor context holds the routines assigned to one processor (or
//! to a shared group of processors) and decides which one runs next.
//! Strategies are trait objects chosen once at configuration time, so
//! processor logic never changes with the scheduling policy.
//!
//! # Implementations
//! - [`FifoContext`] - lock-free FIFO ready queue (default)
//! - [`PriorityContext`] - four priority levels, FIFO within a level

mod fifo;
mod priority;

pub use fifo::FifoContext;
pub use priority::PriorityContext;

use crate::routine::Routine;
use std::sync::Arc;
use std::time::Duration;
use taskloom_core::id::RoutineId;

/// Policy object a processor draws work from.
///
/// All implementations must be thread-safe: a context may be shared by
/// several processors and receives submissions from arbitrary threads.
pub trait ProcessorContext: Send + Sync {
    /// Add a routine to the ready set and wake one waiting processor.
    fn enqueue(&self, routine: Arc<Routine>);

    /// Pop one Ready routine, or None if nothing is runnable. The caller
    /// owns the routine exclusively until it hands it back via `release`.
    fn next_routine(&self) -> Option<Arc<Routine>>;

    /// Post-resume bookkeeping: requeue a yielded routine, park a
    /// blocked one, drop a finished one.
    fn release(&self, routine: Arc<Routine>);

    /// Block the calling processor until work may exist or the timeout
    /// elapses. Spurious returns are fine; the processor loops.
    fn wait(&self, timeout: Duration);

    /// Move a blocked routine back to the ready set. Returns false if the
    /// routine is not parked here (it may be running; the wake latch on
    /// the routine covers that window).
    fn wake(&self, id: RoutineId) -> bool;

    /// Wake every waiting processor (shutdown, or a latched wake that
    /// needs the loop to re-check).
    fn wake_all(&self);

    /// Approximate ready count, used for least-loaded placement.
    fn ready_len(&self) -> usize;
}

//! # taskloom - Cooperative Routine Scheduler
//!
//! M:N scheduling of cooperative routines over a fixed pool of pinned
//! OS threads.
//!
//! ## Features
//!
//! - **Lightweight routines**: guard-paged stacks, lazily initialized,
//!   switched in userspace via hand-written assembly
//! - **Cooperative only**: a routine keeps its processor until it
//!   yields, blocks or finishes - no preemption, no routine migration
//!   mid-run
//! - **Processor groups**: each config group gets its own context
//!   (FIFO or 4-level priority) shared by its processors
//! - **CPU pinning**: "range" and "1to1" affinity modes per group
//! - **Real-time policies**: best-effort SCHED_FIFO / SCHED_RR
//!
//! ## Quick Start
//!
//! ```ignore
//! use taskloom::{Runtime, SchedConfig, Target, yield_now};
//!
//! fn main() {
//!     let mut rt = Runtime::new(SchedConfig::from_env()).unwrap();
//!
//!     rt.spawn(|| {
//!         println!("hello from a routine");
//!         yield_now();
//!         println!("back again");
//!     })
//!     .unwrap();
//!
//!     rt.stop();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  User Code                   │
//! │        spawn(), yield_now(), wake()          │
//! └──────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────┐
//! │                  Scheduler                   │
//! │   target routing, registry, least-loaded     │
//! └──────────────────────────────────────────────┘
//!            │                       │
//!            ▼                       ▼
//!    ┌──────────────┐        ┌──────────────┐
//!    │   Context    │        │   Context    │   one per group
//!    │ (fifo/prio)  │        │ (fifo/prio)  │
//!    └──────────────┘        └──────────────┘
//!       │        │                  │
//!       ▼        ▼                  ▼
//!  ┌────────┐ ┌────────┐       ┌────────┐
//!  │  Proc  │ │  Proc  │       │  Proc  │   one OS thread each,
//!  │ thread │ │ thread │       │ thread │   pinned + RT policy
//!  └────────┘ └────────┘       └────────┘
//! ```

pub use taskloom_core::{
    error::{SchedError, SchedResult},
    id::RoutineId,
    state::{Priority, RoutineState},
};

pub use taskloom_runtime::{
    block_current, yield_now, ContextStrategy, DispatchStrategy, ProcessorSpec, Routine,
    SchedConfig, Scheduler, Target,
};

/// Owning handle over a started scheduler.
///
/// Construction starts the processors; `stop` (or drop) force-stops
/// outstanding routines and joins every dispatch thread.
pub struct Runtime {
    scheduler: Scheduler,
}

impl Runtime {
    /// Validate the config and bring the scheduler up.
    pub fn new(config: SchedConfig) -> SchedResult<Self> {
        let mut scheduler = Scheduler::new(config);
        scheduler.start()?;
        Ok(Self { scheduler })
    }

    /// Spawn a routine on whichever context the dispatch strategy picks.
    pub fn spawn<F>(&self, f: F) -> SchedResult<RoutineId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.spawn(f, Target::Any)
    }

    /// Spawn a routine on a specific processor's context or group.
    pub fn spawn_on<F>(&self, f: F, target: Target) -> SchedResult<RoutineId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.scheduler.spawn(f, target)
    }

    /// Submit a pre-built routine (named, custom priority or stack).
    pub fn submit(&self, routine: Routine, target: Target) -> SchedResult<RoutineId> {
        self.scheduler.submit(routine, target)
    }

    /// Wake a routine parked by [`block_current`].
    pub fn wake(&self, id: RoutineId) -> bool {
        self.scheduler.wake(id)
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop and join everything. Idempotent; also runs on drop.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

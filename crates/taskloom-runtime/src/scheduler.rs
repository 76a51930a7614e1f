//! Scheduler
//!
//! Owns the processors and their contexts. Startup walks the config:
//! one context per group, `processors` dispatch threads bound to it,
//! affinity and real-time policy applied per thread. Submission routes a
//! routine to a context by target, and a registry of live routines backs
//! external wakes.

use crate::config::{ContextStrategy, DispatchStrategy, SchedConfig};
use crate::context::{FifoContext, PriorityContext, ProcessorContext};
use crate::processor::Processor;
use crate::routine::Routine;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use taskloom_core::error::{SchedError, SchedResult};
use taskloom_core::id::RoutineId;
use tracing::{debug, info};

/// Where a submitted routine should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Let the dispatch strategy pick a context.
    Any,
    /// The context serving a specific processor.
    Processor(usize),
    /// The context of a named group.
    Group(String),
}

/// M:N scheduler: routines multiplexed over a fixed set of processors.
pub struct Scheduler {
    config: SchedConfig,
    processors: Vec<Processor>,
    contexts: Vec<Arc<dyn ProcessorContext>>,
    /// Context index for each processor, by processor id.
    proc_ctx: Vec<usize>,
    /// Context index for each group name.
    groups: HashMap<String, usize>,
    registry: Mutex<HashMap<RoutineId, (Weak<Routine>, usize)>>,
    rr: AtomicUsize,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(config: SchedConfig) -> Self {
        Self {
            config,
            processors: Vec::new(),
            contexts: Vec::new(),
            proc_ctx: Vec::new(),
            groups: HashMap::new(),
            registry: Mutex::new(HashMap::new()),
            rr: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        }
    }

    /// Validate the config, spawn every processor and bind contexts.
    pub fn start(&mut self) -> SchedResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(SchedError::AlreadyRunning);
        }
        if let Err(e) = self.build() {
            // A failed start leaves nothing half-built behind the flag
            self.running.store(false, Ordering::Release);
            self.teardown();
            return Err(e);
        }

        info!(
            processors = self.processors.len(),
            groups = self.groups.len(),
            "scheduler started"
        );
        Ok(())
    }

    fn build(&mut self) -> SchedResult<()> {
        self.config.validate()?;

        let specs = self.config.specs.clone();
        let mut next_id = 0usize;
        for spec in &specs {
            let ctx: Arc<dyn ProcessorContext> = match spec.strategy {
                ContextStrategy::Fifo => Arc::new(FifoContext::new()),
                ContextStrategy::Priority => Arc::new(PriorityContext::new()),
            };
            let ctx_idx = self.contexts.len();
            self.contexts.push(ctx.clone());
            self.groups.insert(spec.group.clone(), ctx_idx);

            for k in 0..spec.processors {
                let proc = Processor::new(next_id, self.config.park_timeout)?;
                proc.set_affinity(&spec.cpus, &spec.affinity_mode, k);
                proc.set_sched_policy(&spec.policy, spec.priority);
                proc.bind_context(ctx.clone());
                self.processors.push(proc);
                self.proc_ctx.push(ctx_idx);
                next_id += 1;
            }
            debug!(
                group = %spec.group,
                processors = spec.processors,
                strategy = ?spec.strategy,
                "group up"
            );
        }
        Ok(())
    }

    /// Stop and join every processor, then drop all routing state.
    fn teardown(&mut self) {
        for proc in &self.processors {
            proc.stop();
        }
        // Drop joins each dispatch thread
        self.processors.clear();
        self.contexts.clear();
        self.proc_ctx.clear();
        self.groups.clear();
        self.registry.lock().unwrap().clear();
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Create and submit a routine from a closure, using the configured
    /// stack size.
    pub fn spawn<F>(&self, f: F, target: Target) -> SchedResult<RoutineId>
    where
        F: FnOnce() + Send + 'static,
    {
        let routine = Routine::with_stack_size(f, self.config.stack_size)?;
        self.submit(routine, target)
    }

    /// Route a routine to a context and enqueue it.
    pub fn submit(&self, routine: Routine, target: Target) -> SchedResult<RoutineId> {
        if !self.is_running() {
            return Err(SchedError::NotRunning);
        }
        let ctx_idx = self.route(&target)?;
        let routine = Arc::new(routine);
        let id = routine.id();

        {
            let mut registry = self.registry.lock().unwrap();
            // Piggyback a prune of finished entries on each submit
            registry.retain(|_, (weak, _)| weak.strong_count() > 0);
            registry.insert(id, (Arc::downgrade(&routine), ctx_idx));
        }

        self.contexts[ctx_idx].enqueue(routine);
        Ok(id)
    }

    fn route(&self, target: &Target) -> SchedResult<usize> {
        match target {
            Target::Any => {
                let n = self.contexts.len();
                let offset = self.rr.fetch_add(1, Ordering::Relaxed);
                Ok(match self.config.dispatch {
                    DispatchStrategy::RoundRobin => offset % n,
                    // Rotating the scan start breaks ties round-robin
                    DispatchStrategy::LeastLoaded => (0..n)
                        .map(|k| (offset + k) % n)
                        .min_by_key(|&i| self.contexts[i].ready_len())
                        .unwrap_or(0),
                })
            }
            Target::Processor(id) => self
                .proc_ctx
                .get(*id)
                .copied()
                .ok_or(SchedError::NoSuchProcessor(*id)),
            Target::Group(name) => self
                .groups
                .get(name)
                .copied()
                .ok_or_else(|| SchedError::NoSuchGroup(name.clone())),
        }
    }

    /// Wake a blocked routine. Returns false if the id is unknown or the
    /// routine already finished. If the routine is mid-run, the wake is
    /// latched and applied when it next blocks or is released.
    pub fn wake(&self, id: RoutineId) -> bool {
        let entry = {
            let registry = self.registry.lock().unwrap();
            registry.get(&id).cloned()
        };
        let Some((weak, ctx_idx)) = entry else {
            return false;
        };
        let Some(routine) = weak.upgrade() else {
            return false;
        };
        if routine.state().is_finished() {
            return false;
        }

        routine.request_wake();
        if !self.contexts[ctx_idx].wake(id) {
            // Running or in flight: the latch covers it, but nudge the
            // processors so a just-parked routine is re-checked.
            self.contexts[ctx_idx].wake_all();
        }
        true
    }

    /// Ask every live routine to stop at its next resume point, then stop
    /// and join every processor. Idempotent.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("scheduler stopping");

        {
            let registry = self.registry.lock().unwrap();
            for (weak, _) in registry.values() {
                if let Some(routine) = weak.upgrade() {
                    routine.stop();
                }
            }
        }

        self.teardown();
        info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.is_running())
            .field("processors", &self.processors.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorSpec;
    use crate::routine::block_current;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn small_config() -> SchedConfig {
        SchedConfig::new()
            .spec(ProcessorSpec::new("default").processors(2))
            .park_timeout(Duration::from_millis(10))
    }

    fn wait_for(hits: &AtomicUsize, expect: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while hits.load(Ordering::SeqCst) < expect && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_submit_before_start_fails() {
        let sched = Scheduler::new(small_config());
        assert!(matches!(
            sched.spawn(|| {}, Target::Any),
            Err(SchedError::NotRunning)
        ));
    }

    #[test]
    fn test_double_start_fails() {
        let mut sched = Scheduler::new(small_config());
        sched.start().unwrap();
        assert!(matches!(sched.start(), Err(SchedError::AlreadyRunning)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut sched = Scheduler::new(SchedConfig::new());
        assert!(matches!(
            sched.start(),
            Err(SchedError::InvalidConfig(_))
        ));
        assert!(!sched.is_running());
    }

    #[test]
    fn test_failed_start_leaves_clean_state() {
        let mut sched = Scheduler::new(SchedConfig::new());
        assert!(sched.start().is_err());

        // Nothing half-built: not running, submissions refused
        assert!(!sched.is_running());
        assert!(sched.processors.is_empty());
        assert!(sched.contexts.is_empty());
        assert!(sched.groups.is_empty());
        assert!(matches!(
            sched.spawn(|| {}, Target::Any),
            Err(SchedError::NotRunning)
        ));
    }

    #[test]
    fn test_restart_after_stop() {
        let mut sched = Scheduler::new(small_config());
        sched.start().unwrap();
        sched.stop();

        sched.start().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        sched
            .spawn(
                move || {
                    h.fetch_add(1, Ordering::SeqCst);
                },
                Target::Any,
            )
            .unwrap();
        wait_for(&hits, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        sched.stop();
    }

    #[test]
    fn test_spawned_routines_complete() {
        let mut sched = Scheduler::new(small_config());
        sched.start().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..20 {
            let h = hits.clone();
            sched
                .spawn(
                    move || {
                        h.fetch_add(1, Ordering::SeqCst);
                    },
                    Target::Any,
                )
                .unwrap();
        }

        wait_for(&hits, 20);
        assert_eq!(hits.load(Ordering::SeqCst), 20);
        sched.stop();
    }

    #[test]
    fn test_group_and_processor_targets() {
        let cfg = SchedConfig::new()
            .spec(ProcessorSpec::new("a").processors(1))
            .spec(ProcessorSpec::new("b").processors(1))
            .park_timeout(Duration::from_millis(10));
        let mut sched = Scheduler::new(cfg);
        sched.start().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let h1 = hits.clone();
        let h2 = hits.clone();
        sched
            .spawn(
                move || {
                    h1.fetch_add(1, Ordering::SeqCst);
                },
                Target::Group("b".to_string()),
            )
            .unwrap();
        sched
            .spawn(
                move || {
                    h2.fetch_add(1, Ordering::SeqCst);
                },
                Target::Processor(0),
            )
            .unwrap();

        assert!(matches!(
            sched.spawn(|| {}, Target::Group("missing".to_string())),
            Err(SchedError::NoSuchGroup(_))
        ));
        assert!(matches!(
            sched.spawn(|| {}, Target::Processor(99)),
            Err(SchedError::NoSuchProcessor(99))
        ));

        wait_for(&hits, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        sched.stop();
    }

    #[test]
    fn test_block_and_external_wake() {
        let mut sched = Scheduler::new(small_config());
        sched.start().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = sched
            .spawn(
                move || {
                    h.fetch_add(1, Ordering::SeqCst);
                    block_current();
                    h.fetch_add(1, Ordering::SeqCst);
                },
                Target::Any,
            )
            .unwrap();

        wait_for(&hits, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(sched.wake(id));
        wait_for(&hits, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // Finished routine: wake reports false once pruned or finished
        std::thread::sleep(Duration::from_millis(20));
        assert!(!sched.wake(id));
        sched.stop();
    }

    #[test]
    fn test_wake_unknown_id() {
        let mut sched = Scheduler::new(small_config());
        sched.start().unwrap();
        assert!(!sched.wake(RoutineId::from_raw(0xdead)));
        sched.stop();
    }

    #[test]
    fn test_stop_is_idempotent_and_rejects_submits() {
        let mut sched = Scheduler::new(small_config());
        sched.start().unwrap();
        sched.stop();
        sched.stop();
        assert!(matches!(
            sched.spawn(|| {}, Target::Any),
            Err(SchedError::NotRunning)
        ));
    }

    #[test]
    fn test_stop_interrupts_pending_work() {
        let mut sched = Scheduler::new(
            SchedConfig::new()
                .spec(ProcessorSpec::new("default").processors(1))
                .park_timeout(Duration::from_millis(10)),
        );
        sched.start().unwrap();

        // A routine that would otherwise park forever
        sched.spawn(block_current, Target::Any).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        let start = Instant::now();
        sched.stop();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}

//! Processors
//!
//! One processor owns one OS thread. The thread parks on a condvar until
//! a context is bound, then loops: pop a routine, resume it, hand it back
//! to the context, or wait when the context is empty. Affinity and
//! real-time policy are applied best-effort from outside the thread.

use crate::context::ProcessorContext;
use crate::tls;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use taskloom_core::error::SchedResult;
use tracing::{debug, trace, warn};

/// State shared between a processor handle and its thread.
struct Inner {
    id: usize,
    running: AtomicBool,
    context: Mutex<Option<Arc<dyn ProcessorContext>>>,
    context_cv: Condvar,
    park_timeout: Duration,
}

/// A dispatch thread. Dropping the handle stops and joins the thread.
pub struct Processor {
    inner: Arc<Inner>,
    thread: Option<JoinHandle<()>>,
    id: usize,
}

impl Processor {
    /// Spawn the dispatch thread. It idles until `bind_context`.
    pub fn new(id: usize, park_timeout: Duration) -> SchedResult<Self> {
        let inner = Arc::new(Inner {
            id,
            running: AtomicBool::new(true),
            context: Mutex::new(None),
            context_cv: Condvar::new(),
            park_timeout,
        });

        let thread_inner = inner.clone();
        let thread = std::thread::Builder::new()
            .name(format!("taskloom-proc-{id}"))
            .spawn(move || run(thread_inner))?;

        Ok(Self {
            inner,
            thread: Some(thread),
            id,
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Hand the processor its work source and release the dispatch loop.
    pub fn bind_context(&self, ctx: Arc<dyn ProcessorContext>) {
        let mut guard = self.inner.context.lock().unwrap();
        *guard = Some(ctx);
        self.inner.context_cv.notify_all();
    }

    /// Ask the dispatch loop to exit. Returns once the flag is set; the
    /// thread is joined on drop.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        // Notify under the context lock: a waiter either sees the flag
        // before it parks, or is parked and receives this wakeup. A
        // bare notify could land between its flag check and its wait.
        let guard = self.inner.context.lock().unwrap();
        self.inner.context_cv.notify_all();
        if let Some(ctx) = guard.as_ref() {
            ctx.wake_all();
        }
    }

    /// Pin the dispatch thread to a CPU set. Best-effort: failures are
    /// logged, never returned.
    ///
    /// `mode` selects how `cpus` is read: `"range"` pins to the union of
    /// the listed CPUs, `"1to1"` pins to `cpus[index]`. An empty list or
    /// an unknown mode leaves the thread unpinned.
    pub fn set_affinity(&self, cpus: &[usize], mode: &str, index: usize) {
        if cpus.is_empty() {
            return;
        }
        let chosen: Vec<usize> = match mode {
            "range" => cpus.to_vec(),
            "1to1" => match cpus.get(index) {
                Some(&cpu) => vec![cpu],
                None => {
                    debug!(
                        processor = self.id,
                        index, "1to1 index beyond cpu list, leaving unpinned"
                    );
                    return;
                }
            },
            _ => {
                debug!(processor = self.id, mode, "unknown affinity mode ignored");
                return;
            }
        };

        #[cfg(target_os = "linux")]
        {
            use std::os::unix::thread::JoinHandleExt;
            let Some(handle) = self.thread.as_ref() else {
                return;
            };
            unsafe {
                let mut set: libc::cpu_set_t = std::mem::zeroed();
                libc::CPU_ZERO(&mut set);
                for &cpu in &chosen {
                    libc::CPU_SET(cpu, &mut set);
                }
                let rc = libc::pthread_setaffinity_np(
                    handle.as_pthread_t(),
                    std::mem::size_of::<libc::cpu_set_t>(),
                    &set,
                );
                if rc != 0 {
                    warn!(processor = self.id, rc, cpus = ?chosen, "pthread_setaffinity_np failed");
                } else {
                    debug!(processor = self.id, cpus = ?chosen, "affinity set");
                }
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            debug!(processor = self.id, cpus = ?chosen, "affinity unsupported on this platform");
        }
    }

    /// Apply a real-time scheduling policy to the dispatch thread.
    /// `"SCHED_FIFO"` and `"SCHED_RR"` are recognized; anything else is a
    /// no-op. Best-effort: typically needs CAP_SYS_NICE.
    pub fn set_sched_policy(&self, policy: &str, priority: i32) {
        #[cfg(target_os = "linux")]
        {
            use std::os::unix::thread::JoinHandleExt;
            let native = match policy {
                "SCHED_FIFO" => libc::SCHED_FIFO,
                "SCHED_RR" => libc::SCHED_RR,
                _ => return,
            };
            let Some(handle) = self.thread.as_ref() else {
                return;
            };
            let param = libc::sched_param {
                sched_priority: priority,
            };
            let rc = unsafe {
                libc::pthread_setschedparam(handle.as_pthread_t(), native, &param)
            };
            if rc != 0 {
                warn!(
                    processor = self.id,
                    policy, priority, rc, "pthread_setschedparam failed"
                );
            } else {
                debug!(processor = self.id, policy, priority, "sched policy set");
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (policy, priority);
        }
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(processor = self.id, "dispatch thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("id", &self.id)
            .field("running", &self.inner.running.load(Ordering::Relaxed))
            .finish()
    }
}

/// Dispatch loop body, runs on the processor thread.
fn run(inner: Arc<Inner>) {
    tls::set_processor_id(inner.id);
    let mut main_ctx = crate::arch::SavedContext::new();
    tls::set_main_context(&mut main_ctx);
    debug!(processor = inner.id, "dispatch thread up");

    while inner.running.load(Ordering::Acquire) {
        // Park until a context is bound; no spinning before bind.
        let ctx = {
            let mut guard = inner.context.lock().unwrap();
            loop {
                if !inner.running.load(Ordering::Acquire) {
                    tls::clear_main_context();
                    debug!(processor = inner.id, "dispatch thread down");
                    return;
                }
                match guard.as_ref() {
                    Some(ctx) => break ctx.clone(),
                    None => guard = inner.context_cv.wait(guard).unwrap(),
                }
            }
        };

        while inner.running.load(Ordering::Acquire) {
            match ctx.next_routine() {
                Some(routine) => {
                    trace!(processor = inner.id, id = %routine.id(), "resuming");
                    routine.resume();
                    ctx.release(routine);
                }
                None => ctx.wait(inner.park_timeout),
            }
        }
    }

    tls::clear_main_context();
    debug!(processor = inner.id, "dispatch thread down");
}

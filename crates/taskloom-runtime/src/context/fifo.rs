//! FIFO processor context (default strategy)
//!
//! Ready order is submission order. The ready queue is lock-free; only
//! parking takes a mutex. A wake may race an `is_empty` check and get
//! lost, which the bounded wait timeout covers - processors always
//! re-check after returning from `wait`.

use super::ProcessorContext;
use crate::routine::Routine;
use crossbeam_queue::SegQueue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use taskloom_core::id::RoutineId;
use taskloom_core::state::RoutineState;
use tracing::warn;

/// FIFO-ordered context, shareable by any number of processors.
pub struct FifoContext {
    ready: SegQueue<Arc<Routine>>,
    blocked: Mutex<HashMap<RoutineId, Arc<Routine>>>,
    park: Mutex<()>,
    cv: Condvar,
    parked: AtomicUsize,
}

impl FifoContext {
    pub fn new() -> Self {
        Self {
            ready: SegQueue::new(),
            blocked: Mutex::new(HashMap::new()),
            park: Mutex::new(()),
            cv: Condvar::new(),
            parked: AtomicUsize::new(0),
        }
    }

    fn notify_one(&self) {
        if self.parked.load(Ordering::Acquire) > 0 {
            self.cv.notify_one();
        }
    }
}

impl Default for FifoContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorContext for FifoContext {
    fn enqueue(&self, routine: Arc<Routine>) {
        self.ready.push(routine);
        self.notify_one();
    }

    fn next_routine(&self) -> Option<Arc<Routine>> {
        self.ready.pop()
    }

    fn release(&self, routine: Arc<Routine>) {
        match routine.state() {
            RoutineState::Ready => self.enqueue(routine),
            RoutineState::Blocked => {
                // Latch check and park are one step under the blocked
                // lock. Wakers latch before probing this map, so
                // whichever side locks second observes the other.
                let mut blocked = self.blocked.lock().unwrap();
                if routine.take_wake_pending() {
                    drop(blocked);
                    routine.set_state(RoutineState::Ready);
                    self.enqueue(routine);
                } else {
                    blocked.insert(routine.id(), routine);
                }
            }
            RoutineState::Finished => drop(routine),
            RoutineState::Running => {
                // Resume never hands back a Running routine
                warn!(id = %routine.id(), "released routine still Running");
            }
        }
    }

    fn wait(&self, timeout: Duration) {
        let guard = self.park.lock().unwrap();
        if self.ready.is_empty() {
            self.parked.fetch_add(1, Ordering::AcqRel);
            let _ = self.cv.wait_timeout(guard, timeout);
            self.parked.fetch_sub(1, Ordering::AcqRel);
        }
    }

    fn wake(&self, id: RoutineId) -> bool {
        let woken = self.blocked.lock().unwrap().remove(&id);
        match woken {
            Some(routine) => {
                routine.take_wake_pending();
                routine.set_state(RoutineState::Ready);
                self.enqueue(routine);
                true
            }
            None => false,
        }
    }

    fn wake_all(&self) {
        self.cv.notify_all();
    }

    fn ready_len(&self) -> usize {
        self.ready.len()
    }
}

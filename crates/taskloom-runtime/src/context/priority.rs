//! Priority processor context
//!
//! Four FIFO rings, one per [`Priority`] level; `next_routine` drains
//! the highest non-empty level first. Low-priority work can starve under
//! sustained higher-priority load, which is the intended trade.

use super::ProcessorContext;
use crate::routine::Routine;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use taskloom_core::id::RoutineId;
use taskloom_core::state::{Priority, RoutineState};
use tracing::warn;

struct Levels {
    rings: [VecDeque<Arc<Routine>>; Priority::COUNT],
}

impl Levels {
    fn new() -> Self {
        Self {
            rings: [const { VecDeque::new() }; Priority::COUNT],
        }
    }

    fn push(&mut self, routine: Arc<Routine>) {
        self.rings[routine.priority().as_index()].push_back(routine);
    }

    fn pop_highest(&mut self) -> Option<Arc<Routine>> {
        self.rings.iter_mut().find_map(|ring| ring.pop_front())
    }

    fn len(&self) -> usize {
        self.rings.iter().map(|r| r.len()).sum()
    }
}

/// Priority-ordered context, shareable by any number of processors.
pub struct PriorityContext {
    levels: Mutex<Levels>,
    blocked: Mutex<HashMap<RoutineId, Arc<Routine>>>,
    cv: Condvar,
}

impl PriorityContext {
    pub fn new() -> Self {
        Self {
            levels: Mutex::new(Levels::new()),
            blocked: Mutex::new(HashMap::new()),
            cv: Condvar::new(),
        }
    }
}

impl Default for PriorityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorContext for PriorityContext {
    fn enqueue(&self, routine: Arc<Routine>) {
        self.levels.lock().unwrap().push(routine);
        self.cv.notify_one();
    }

    fn next_routine(&self) -> Option<Arc<Routine>> {
        self.levels.lock().unwrap().pop_highest()
    }

    fn release(&self, routine: Arc<Routine>) {
        match routine.state() {
            RoutineState::Ready => self.enqueue(routine),
            RoutineState::Blocked => {
                // Latch check and park are one step under the blocked
                // lock, same protocol as the fifo strategy.
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
                warn!(id = %routine.id(), "released routine still Running");
            }
        }
    }

    fn wait(&self, timeout: Duration) {
        let guard = self.levels.lock().unwrap();
        if guard.len() == 0 {
            let _ = self.cv.wait_timeout(guard, timeout);
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
        self.levels.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine_at(priority: Priority) -> Arc<Routine> {
        Arc::new(Routine::new(|| {}).unwrap().with_priority(priority))
    }

    #[test]
    fn test_highest_level_first() {
        let ctx = PriorityContext::new();
        let low = routine_at(Priority::Low);
        let critical = routine_at(Priority::Critical);
        let normal = routine_at(Priority::Normal);

        ctx.enqueue(low);
        ctx.enqueue(normal);
        ctx.enqueue(critical);

        assert_eq!(ctx.next_routine().unwrap().priority(), Priority::Critical);
        assert_eq!(ctx.next_routine().unwrap().priority(), Priority::Normal);
        assert_eq!(ctx.next_routine().unwrap().priority(), Priority::Low);
    }

    #[test]
    fn test_fifo_within_level() {
        let ctx = PriorityContext::new();
        let first = routine_at(Priority::Normal);
        let second = routine_at(Priority::Normal);
        let (ida, idb) = (first.id(), second.id());

        ctx.enqueue(first);
        ctx.enqueue(second);

        assert_eq!(ctx.next_routine().unwrap().id(), ida);
        assert_eq!(ctx.next_routine().unwrap().id(), idb);
    }

    #[test]
    fn test_wake_missing_the_map_still_lands() {
        let ctx = PriorityContext::new();
        let r = routine_at(Priority::Normal);
        let id = r.id();
        r.set_state(RoutineState::Blocked);

        // Latch set, but the routine is not parked yet
        r.request_wake();
        assert!(!ctx.wake(id));

        ctx.release(r);
        assert_eq!(ctx.ready_len(), 1);
    }

    #[test]
    fn test_blocked_and_wake() {
        let ctx = PriorityContext::new();
        let r = routine_at(Priority::High);
        let id = r.id();
        r.set_state(RoutineState::Blocked);

        ctx.release(r);
        assert_eq!(ctx.ready_len(), 0);
        assert!(ctx.wake(id));
        assert_eq!(ctx.ready_len(), 1);
    }
}

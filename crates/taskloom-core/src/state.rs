//! Routine state and priority types

use core::fmt;

/// Execution state of a routine.
///
/// Transitions are driven by resume/yield/block calls from exactly one
/// processor at a time. `Running` is never observable after release:
/// every resume ends in `Ready`, `Blocked` or `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RoutineState {
    /// Ready to run, queued on a processor context
    Ready = 0,

    /// Currently executing on a processor
    Running = 1,

    /// Parked until explicitly woken
    Blocked = 2,

    /// Finished execution, storage reclaimable once released
    Finished = 3,
}

impl RoutineState {
    /// Check if this state allows the routine to be scheduled
    #[inline]
    pub const fn is_runnable(&self) -> bool {
        matches!(self, RoutineState::Ready)
    }

    /// Check if the routine has terminated
    #[inline]
    pub const fn is_finished(&self) -> bool {
        matches!(self, RoutineState::Finished)
    }
}

impl From<u8> for RoutineState {
    fn from(v: u8) -> Self {
        match v {
            0 => RoutineState::Ready,
            1 => RoutineState::Running,
            2 => RoutineState::Blocked,
            _ => RoutineState::Finished,
        }
    }
}

impl From<RoutineState> for u8 {
    fn from(state: RoutineState) -> u8 {
        state as u8
    }
}

/// Priority level for routines.
///
/// Consumed by the priority context strategy; the FIFO strategy ignores
/// it. Lower discriminant = scheduled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    /// Latency-critical work, always drained first
    Critical = 0,

    /// Latency-sensitive work
    High = 1,

    /// Default for submitted routines
    Normal = 2,

    /// Background work, may be starved under load
    Low = 3,
}

impl Priority {
    /// Number of priority levels
    pub const COUNT: usize = 4;

    /// Get priority as index (0 = Critical, 3 = Low)
    #[inline]
    pub const fn as_index(&self) -> usize {
        *self as usize
    }

    /// Iterator over all priorities, highest first
    pub fn iter() -> impl Iterator<Item = Priority> {
        [
            Priority::Critical,
            Priority::High,
            Priority::Normal,
            Priority::Low,
        ]
        .into_iter()
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "CRITICAL"),
            Priority::High => write!(f, "HIGH"),
            Priority::Normal => write!(f, "NORMAL"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

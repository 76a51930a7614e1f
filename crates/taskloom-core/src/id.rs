//! Routine identifier type

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a routine.
///
/// Ids are handed out from a process-wide counter and never reused.
/// The maximum value (`u64::MAX`) is reserved as a sentinel for
/// "no routine".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RoutineId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

impl RoutineId {
    /// Sentinel value indicating no routine
    pub const NONE: RoutineId = RoutineId(u64::MAX);

    /// Allocate the next unused id
    #[inline]
    pub fn next() -> Self {
        RoutineId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a RoutineId from a raw value
    #[inline]
    pub const fn from_raw(id: u64) -> Self {
        RoutineId(id)
    }

    /// Get the raw u64 value
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if this is the NONE sentinel
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    /// Check if this is a valid routine id
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Debug for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "RoutineId(NONE)")
        } else {
            write!(f, "RoutineId({})", self.0)
        }
    }
}

impl fmt::Display for RoutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for RoutineId {
    fn default() -> Self {
        RoutineId::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_unique() {
        let a = RoutineId::next();
        let b = RoutineId::next();
        assert_ne!(a, b);
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[test]
    fn test_none_sentinel() {
        let none = RoutineId::NONE;
        assert!(none.is_none());
        assert!(!none.is_some());
        assert_eq!(format!("{}", none), "none");
    }

    #[test]
    fn test_from_raw() {
        let id = RoutineId::from_raw(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{}", id), "42");
    }
}

//! Error types for the taskloom scheduler

use thiserror::Error;

/// Result type for scheduler operations
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur in scheduler operations.
///
/// Affinity and scheduling-policy failures are deliberately absent:
/// those are best-effort OS requests that are logged, never surfaced.
#[derive(Debug, Error)]
pub enum SchedError {
    /// Configuration rejected by validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Scheduler was already started
    #[error("scheduler already running")]
    AlreadyRunning,

    /// Scheduler has not been started, or was already stopped
    #[error("scheduler not running")]
    NotRunning,

    /// Spawning a processor thread failed
    #[error("failed to spawn processor thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    /// Mapping or protecting a routine stack failed
    #[error("routine stack allocation failed (size {0})")]
    StackAlloc(usize),

    /// Submission targeted a processor index that does not exist
    #[error("no processor with index {0}")]
    NoSuchProcessor(usize),

    /// Submission targeted a group name that does not exist
    #[error("no processor group named {0:?}")]
    NoSuchGroup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = SchedError::InvalidConfig("processors must be > 0".into());
        assert_eq!(e.to_string(), "invalid config: processors must be > 0");

        let e = SchedError::NoSuchGroup("control".into());
        assert_eq!(e.to_string(), "no processor group named \"control\"");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let e: SchedError = io.into();
        assert!(matches!(e, SchedError::ThreadSpawn(_)));
    }
}

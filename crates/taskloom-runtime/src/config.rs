//! Scheduler configuration
//!
//! Built in code or seeded from the environment. A config is a set of
//! processor group specs plus global knobs; `validate` runs once at
//! scheduler start and rejects anything the runtime cannot honor.
//!
//! Environment overrides:
//! - `LOOM_PROCESSORS` - processor count for the default group
//! - `LOOM_PARK_TIMEOUT_MS` - idle processor park timeout
//! - `LOOM_STACK_SIZE` - per-routine usable stack bytes

use crate::stack::{DEFAULT_STACK_SIZE, MIN_STACK_SIZE};
use std::collections::HashSet;
use std::time::Duration;
use taskloom_core::env::env_get;
use taskloom_core::error::{SchedError, SchedResult};

/// How a processor context orders runnable routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextStrategy {
    /// Submission order, lock-free ready queue.
    #[default]
    Fifo,
    /// Four levels, highest first, FIFO within a level.
    Priority,
}

/// How `Target::Any` submissions pick a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchStrategy {
    /// Context with the fewest ready routines.
    #[default]
    LeastLoaded,
    /// Rotate across contexts.
    RoundRobin,
}

/// One group of processors sharing a context.
#[derive(Debug, Clone)]
pub struct ProcessorSpec {
    pub group: String,
    pub processors: usize,
    pub cpus: Vec<usize>,
    pub affinity_mode: String,
    pub policy: String,
    pub priority: i32,
    pub strategy: ContextStrategy,
}

impl ProcessorSpec {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            processors: 1,
            cpus: Vec::new(),
            affinity_mode: "range".to_string(),
            policy: String::new(),
            priority: 0,
            strategy: ContextStrategy::Fifo,
        }
    }

    pub fn processors(mut self, n: usize) -> Self {
        self.processors = n;
        self
    }

    /// CPUs this group may run on; empty means unpinned.
    pub fn cpus(mut self, cpus: Vec<usize>) -> Self {
        self.cpus = cpus;
        self
    }

    /// `"range"` (union of the cpu list) or `"1to1"` (k-th processor to
    /// the k-th cpu).
    pub fn affinity_mode(mut self, mode: impl Into<String>) -> Self {
        self.affinity_mode = mode.into();
        self
    }

    /// `"SCHED_FIFO"` or `"SCHED_RR"`, with the OS priority to request.
    pub fn realtime(mut self, policy: impl Into<String>, priority: i32) -> Self {
        self.policy = policy.into();
        self.priority = priority;
        self
    }

    pub fn strategy(mut self, strategy: ContextStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Full scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedConfig {
    pub specs: Vec<ProcessorSpec>,
    pub park_timeout: Duration,
    pub stack_size: usize,
    pub dispatch: DispatchStrategy,
}

impl SchedConfig {
    /// Empty config; add specs before starting.
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            park_timeout: Duration::from_millis(100),
            stack_size: DEFAULT_STACK_SIZE,
            dispatch: DispatchStrategy::LeastLoaded,
        }
    }

    /// One default group sized from the environment, falling back to the
    /// machine's parallelism.
    pub fn from_env() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let processors = env_get("LOOM_PROCESSORS", parallelism);
        let park_ms = env_get("LOOM_PARK_TIMEOUT_MS", 100u64);
        let stack_size = env_get("LOOM_STACK_SIZE", DEFAULT_STACK_SIZE);

        Self {
            specs: vec![ProcessorSpec::new("default").processors(processors)],
            park_timeout: Duration::from_millis(park_ms),
            stack_size,
            dispatch: DispatchStrategy::LeastLoaded,
        }
    }

    pub fn spec(mut self, spec: ProcessorSpec) -> Self {
        self.specs.push(spec);
        self
    }

    pub fn park_timeout(mut self, timeout: Duration) -> Self {
        self.park_timeout = timeout;
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchStrategy) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Total processors across all groups.
    pub fn total_processors(&self) -> usize {
        self.specs.iter().map(|s| s.processors).sum()
    }

    pub fn validate(&self) -> SchedResult<()> {
        if self.specs.is_empty() {
            return Err(SchedError::InvalidConfig(
                "no processor groups configured".to_string(),
            ));
        }
        let mut groups = HashSet::new();
        for spec in &self.specs {
            if spec.processors == 0 {
                return Err(SchedError::InvalidConfig(format!(
                    "group '{}' has zero processors",
                    spec.group
                )));
            }
            if !groups.insert(spec.group.as_str()) {
                return Err(SchedError::InvalidConfig(format!(
                    "duplicate group '{}'",
                    spec.group
                )));
            }
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(SchedError::InvalidConfig(format!(
                "stack size {} below minimum {}",
                self.stack_size, MIN_STACK_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_has_a_group() {
        let cfg = SchedConfig::from_env();
        assert_eq!(cfg.specs.len(), 1);
        assert!(cfg.specs[0].processors >= 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let cfg = SchedConfig::new()
            .spec(
                ProcessorSpec::new("control")
                    .processors(2)
                    .cpus(vec![0, 1])
                    .affinity_mode("1to1")
                    .realtime("SCHED_FIFO", 10)
                    .strategy(ContextStrategy::Priority),
            )
            .park_timeout(Duration::from_millis(5))
            .dispatch(DispatchStrategy::RoundRobin);

        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.total_processors(), 2);
        assert_eq!(cfg.specs[0].strategy, ContextStrategy::Priority);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            SchedConfig::new().validate(),
            Err(SchedError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_processors() {
        let cfg = SchedConfig::new().spec(ProcessorSpec::new("g").processors(0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_groups() {
        let cfg = SchedConfig::new()
            .spec(ProcessorSpec::new("g"))
            .spec(ProcessorSpec::new("g"));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_tiny_stack() {
        let cfg = SchedConfig::new()
            .spec(ProcessorSpec::new("g"))
            .stack_size(1024);
        assert!(cfg.validate().is_err());
    }
}

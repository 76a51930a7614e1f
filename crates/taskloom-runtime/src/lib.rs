//! # taskloom-runtime
//!
//! The scheduler proper: OS threads, routine stacks and context switching.
//!
//! This crate provides:
//! - Architecture-specific context switching (`arch`)
//! - Guard-paged routine stacks (`stack`)
//! - The cooperative `Routine` unit of work (`routine`)
//! - Pluggable processor contexts (`context`)
//! - Processor worker threads with affinity/policy tuning (`processor`)
//! - The `Scheduler` that wires everything together (`scheduler`)

pub mod arch;
pub mod config;
pub mod context;
pub mod processor;
pub mod routine;
pub mod scheduler;
pub mod stack;
pub mod tls;

// Re-exports
pub use config::{ContextStrategy, DispatchStrategy, ProcessorSpec, SchedConfig};
pub use context::{FifoContext, PriorityContext, ProcessorContext};
pub use processor::Processor;
pub use routine::{block_current, yield_now, Routine};
pub use scheduler::{Scheduler, Target};

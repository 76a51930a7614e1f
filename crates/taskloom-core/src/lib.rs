//! # taskloom-core
//!
//! Core types for the taskloom routine scheduler.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Everything that touches threads, stacks or CPU registers lives in
//! `taskloom-runtime`.
//!
//! ## Modules
//!
//! - `id` - Routine identifier type
//! - `state` - Routine state and priority enums
//! - `error` - Error types
//! - `env` - Environment variable utilities

pub mod env;
pub mod error;
pub mod id;
pub mod state;

// Re-exports for convenience
pub use env::{env_get, env_get_opt};
pub use error::{SchedError, SchedResult};
pub use id::RoutineId;
pub use state::{Priority, RoutineState};

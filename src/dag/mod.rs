// src/dag/mod.rs

//! Dependency tracking and dispatch.
//!
//! - [`graph`] tracks outstanding dependencies and dependents of live jobs.
//! - [`ready_queue`] orders eligible jobs by `(priority, sequence)`.
//! - [`scheduler`] is the façade collaborators submit work to.
//! - [`stats`] holds counters and the failure log.

pub mod graph;
pub mod ready_queue;
pub mod scheduler;
pub mod stats;

pub use graph::DependencyGraph;
pub use ready_queue::{OrderKey, ReadyQueue};
pub use scheduler::{QueuedJob, Scheduler};
pub use stats::{FailedJob, SchedulerStats};

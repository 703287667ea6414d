// src/engine/mod.rs

//! Async shell around the scheduler.
//!
//! The scheduler itself is synchronous and thread-based. This module drives
//! it from Tokio for the `jobsched` binary: start the pool, submit a plan,
//! wait for every job on a blocking thread, react to Ctrl-C, and collect a
//! summary.

use std::time::Duration;

use crate::dag::{FailedJob, SchedulerStats};

pub mod runtime;

pub use runtime::{Runtime, run_plan};

/// Options for a single plan run.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Overrides `[config].workers` from the plan.
    pub workers: Option<usize>,
    /// How often the completion waiter re-checks for cancellation.
    pub poll_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            workers: None,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// What a plan run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stats: SchedulerStats,
    pub failed: Vec<FailedJob>,
    /// The run was cut short by Ctrl-C.
    pub interrupted: bool,
    /// Jobs that had not reached a terminal state when the run ended.
    pub unfinished: usize,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        !self.interrupted && self.unfinished == 0 && self.failed.is_empty()
    }
}

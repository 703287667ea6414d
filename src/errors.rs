// src/errors.rs

//! Crate-wide error types.
//!
//! - [`SchedulerError`]: an operation was rejected by the scheduler. Always
//!   returned synchronously to the caller.
//! - [`Interrupted`]: a blocking wait for a job was cancelled. This is a
//!   signal, not a failure.
//! - [`JobschedError`]: everything above the scheduler (plan files, CLI).

use thiserror::Error;

use crate::job::{JobId, JobState};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("scheduler is shutting down")]
    ShuttingDown,

    #[error("{0} is already known to the scheduler")]
    DuplicateJob(JobId),

    #[error("{id} cannot be submitted from state {state:?}")]
    NotSubmittable { id: JobId, state: JobState },

    #[error("{0} is not enqueued")]
    NotEnqueued(JobId),

    #[error("{0} is enqueued but still waiting on dependencies")]
    NotReady(JobId),

    #[error("{0} is already running")]
    AlreadyRunning(JobId),

    #[error("{0} is not running in this scheduler")]
    NotRunning(JobId),

    #[error("{job} depends on {dependency}, which is neither enqueued nor finished")]
    UnknownDependency { job: JobId, dependency: JobId },

    #[error("{job} waits on {dependency}; batch submissions must not have outstanding dependencies")]
    UnresolvedDependency { job: JobId, dependency: JobId },

    #[error("{0} cannot depend on itself")]
    SelfDependency(JobId),

    #[error("making {job} depend on {dependency} would create a dependency cycle")]
    DependencyCycle { job: JobId, dependency: JobId },

    #[error("{0} still has dependents in the scheduler")]
    HasDependents(JobId),

    #[error("{id} can no longer be modified in state {state:?}")]
    JobFrozen { id: JobId, state: JobState },

    #[error("{id}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Returned by blocking waits that were woken by `stop_execute()` or
/// `shutdown()` instead of a job becoming available.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wait for the next job was interrupted")]
pub struct Interrupted;

#[derive(Error, Debug)]
pub enum JobschedError {
    #[error("Plan error: {0}")]
    PlanError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in job plan: {0}")]
    DependencyCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Scheduling error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobschedError>;

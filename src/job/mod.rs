// src/job/mod.rs

//! Units of schedulable work.
//!
//! - [`state`] holds the job state machine.
//! - [`body`] defines the [`JobBody`] contract that collaborators implement.
//! - [`handle`] provides [`Job`], the shared handle that is submitted to the
//!   scheduler, plus identity and failure types.

pub mod body;
pub mod handle;
pub mod state;

pub use body::{FnBody, JobBody};
pub use handle::{Job, JobFailure, JobId, JobOutcome};
pub use state::JobState;

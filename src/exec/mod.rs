// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`worker`] owns the worker threads (persistent pool members and
//!   one-shot workers) and the registry the scheduler keeps of them.
//! - [`job_runner`] runs one job on the calling thread, captures errors and
//!   panics, and reports the terminal outcome to the scheduler.
//! - [`shell`] provides a [`JobBody`](crate::job::JobBody) that runs a shell
//!   command, used by plan files.

pub mod job_runner;
pub mod shell;
pub mod worker;

pub use job_runner::run_job;
pub use shell::ShellJob;
pub use worker::{WorkerId, WorkerInfo, WorkerKind};

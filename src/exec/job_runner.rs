// src/exec/job_runner.rs

//! Execution of a single job on the calling thread.

use tracing::{debug, error, warn};

use crate::dag::Scheduler;
use crate::job::{Job, JobOutcome, JobState};

/// Execute a job that the caller has taken from `scheduler` and report its
/// outcome back.
///
/// Errors and panics from the job body become `Failed`; they never propagate
/// to the caller. Returns the terminal state.
pub fn run_job(scheduler: &Scheduler, job: &Job) -> JobState {
    debug!(job = %job.id(), kind = job.kind(), "executing job");

    let outcome = job.execute();
    match &outcome {
        JobOutcome::Finished => {
            debug!(job = %job.id(), kind = job.kind(), "job finished");
        }
        JobOutcome::Failed(failure) => {
            warn!(
                job = %job.id(),
                kind = job.kind(),
                panicked = failure.panicked(),
                error = %failure,
                "job failed"
            );
        }
    }

    let state = outcome.state();
    if let Err(err) = scheduler.job_state_changed(job, outcome) {
        error!(job = %job.id(), error = %err, "could not report job outcome");
    }
    state
}

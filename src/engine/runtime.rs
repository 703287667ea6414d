// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::Scheduler;
use crate::errors::{Error, JobschedError, Result};
use crate::job::Job;
use crate::plan::{PlanFile, PlannedJobs, build_jobs};

use super::{RunSummary, RuntimeOptions};

/// Runs one plan to completion on a fresh scheduler.
///
/// All scheduling semantics live in [`Scheduler`]; this struct only does
/// the async plumbing: submission, waiting without blocking the executor,
/// Ctrl-C handling and teardown.
pub struct Runtime {
    scheduler: Scheduler,
    jobs: PlannedJobs,
    workers: usize,
    one_shot_workers: usize,
    options: RuntimeOptions,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("jobs", &self.jobs.len())
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn from_plan(plan: &PlanFile, options: RuntimeOptions) -> Result<Self> {
        let workers = options.workers.unwrap_or(plan.config.workers);
        if workers == 0 {
            return Err(JobschedError::PlanError(
                "at least one worker is required".to_string(),
            ));
        }

        Ok(Self {
            scheduler: Scheduler::new(plan.config.scheduler.clone()),
            jobs: build_jobs(plan)?,
            workers,
            one_shot_workers: plan.config.one_shot_workers,
            options,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn jobs(&self) -> &PlannedJobs {
        &self.jobs
    }

    /// Start the pool, submit every job and wait until all of them are
    /// terminal (or Ctrl-C is pressed). Workers are stopped and joined
    /// before returning.
    pub async fn run(self) -> Result<RunSummary> {
        info!(
            jobs = self.jobs.len(),
            workers = self.workers,
            one_shot_workers = self.one_shot_workers,
            "jobsched runtime started"
        );

        if let Err(err) = self.start_and_submit() {
            self.teardown().await?;
            return Err(err);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let mut waiter = {
            let jobs = self.jobs.jobs();
            let cancel = Arc::clone(&cancel);
            let poll = self.options.poll_interval;
            tokio::task::spawn_blocking(move || wait_all(&jobs, &cancel, poll))
        };

        let interrupted = tokio::select! {
            joined = &mut waiter => {
                joined.map_err(Error::from)?;
                false
            }
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    warn!("Ctrl-C received; stopping workers after their current job");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "failed to listen for Ctrl+C; waiting for jobs");
                    (&mut waiter).await.map_err(Error::from)?;
                    false
                }
            }
        };

        if interrupted {
            cancel.store(true, Ordering::SeqCst);
            waiter.await.map_err(Error::from)?;
        }

        self.teardown().await?;

        let unfinished = self
            .jobs
            .iter()
            .filter(|(_, job)| !job.state().is_terminal())
            .count();

        let summary = RunSummary {
            stats: self.scheduler.scheduler_stats(),
            failed: self.scheduler.failed_queue(),
            interrupted,
            unfinished,
        };
        info!(stats = %summary.stats, unfinished, "runtime exiting");
        Ok(summary)
    }

    fn start_and_submit(&self) -> Result<()> {
        self.scheduler.start_execute(self.workers)?;
        for _ in 0..self.one_shot_workers {
            self.scheduler.start_one_shot_worker()?;
        }

        for (name, job) in self.jobs.iter() {
            debug!(name = %name, job = %job.id(), "submitting plan job");
            self.scheduler.enqueue(job)?;
        }
        Ok(())
    }

    /// Stop the pool and join worker threads off the async executor.
    async fn teardown(&self) -> Result<()> {
        self.scheduler.stop_execute();
        let scheduler = self.scheduler.clone();
        tokio::task::spawn_blocking(move || scheduler.shutdown())
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

/// Build a [`Runtime`] for `plan` and run it.
pub async fn run_plan(plan: &PlanFile, options: RuntimeOptions) -> Result<RunSummary> {
    Runtime::from_plan(plan, options)?.run().await
}

/// Wait for every job to become terminal, giving up early once `cancel` is
/// set.
fn wait_all(jobs: &[Job], cancel: &AtomicBool, poll: Duration) {
    for job in jobs {
        while job.wait_for_finished_timeout(poll).is_none() {
            if cancel.load(Ordering::SeqCst) {
                debug!("completion wait cancelled");
                return;
            }
        }
    }
}

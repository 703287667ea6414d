// src/lib.rs

pub mod cli;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod plan;
pub mod types;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::engine::{RunSummary, RuntimeOptions, run_plan};
use crate::plan::loader::load_and_validate;
use crate::plan::model::PlanFile;
use crate::plan::validate::submission_order;

pub use crate::dag::{FailedJob, QueuedJob, Scheduler, SchedulerStats};
pub use crate::errors::{Interrupted, JobschedError, SchedulerError};
pub use crate::exec::{ShellJob, WorkerId, WorkerInfo, WorkerKind, run_job};
pub use crate::job::{FnBody, Job, JobBody, JobFailure, JobId, JobOutcome, JobState};
pub use crate::types::{DependencyFailurePolicy, SchedulerConfig};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the plan, then either prints it (`--dry-run`) or
/// runs it on a fresh scheduler and prints a summary. Returns an error when
/// any job failed or the run was interrupted.
pub async fn run(args: CliArgs) -> Result<()> {
    let plan_path = args.plan.clone();
    let plan = load_and_validate(&plan_path)
        .with_context(|| format!("loading plan {}", plan_path.display()))?;

    if args.dry_run {
        print_dry_run(&plan)?;
        return Ok(());
    }

    let options = RuntimeOptions {
        workers: args.workers,
        ..RuntimeOptions::default()
    };
    info!(plan = %plan_path.display(), jobs = plan.job.len(), "running plan");

    let summary = run_plan(&plan, options).await?;
    print_summary(&summary);

    if summary.interrupted {
        bail!("interrupted with {} job(s) unfinished", summary.unfinished);
    }
    if !summary.failed.is_empty() {
        bail!("{} job(s) failed", summary.failed.len());
    }
    Ok(())
}

/// Print jobs in the order they would be submitted.
fn print_dry_run(plan: &PlanFile) -> Result<()> {
    println!("jobsched dry-run");
    println!("  config.workers = {}", plan.config.workers);
    println!("  config.one_shot_workers = {}", plan.config.one_shot_workers);
    println!(
        "  config.on_dependency_failure = {:?}",
        plan.config.scheduler.on_dependency_failure
    );
    println!();

    println!("jobs ({}):", plan.job.len());
    for name in submission_order(&plan.job)? {
        let Some(job) = plan.job.get(&name) else {
            continue;
        };
        println!("  - {name}");
        println!("      cmd: {}", job.cmd);
        if job.priority != 0 {
            println!("      priority: {}", job.priority);
        }
        if !job.after.is_empty() {
            println!("      after: {:?}", job.after);
        }
        if let Some(ref kind) = job.kind {
            println!("      kind: {kind}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let stats = &summary.stats;
    println!(
        "jobsched: {} finished, {} failed, {} submitted",
        stats.finished, stats.failed, stats.total_submitted
    );
    for failed in &summary.failed {
        println!("  failed {} ({}): {}", failed.id, failed.kind, failed.failure);
    }
    if summary.unfinished > 0 {
        println!("  {} job(s) did not finish", summary.unfinished);
    }
}

// src/dag/stats.rs

//! Passive observers: counters and the failure log.

use std::collections::BTreeMap;
use std::fmt;

use crate::job::{Job, JobFailure, JobId};

/// Point-in-time copy of scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Queued jobs still waiting on dependencies.
    pub waiting: usize,
    /// Queued jobs eligible to run.
    pub ready: usize,
    pub running: usize,
    pub finished: u64,
    pub failed: u64,
    /// Jobs ever accepted by `enqueue` / `enqueue_no_dependencies`.
    pub total_submitted: u64,
    /// Live persistent workers.
    pub worker_threads: usize,
    /// Live one-shot workers.
    pub one_shot_workers: usize,
    /// Failures per job kind.
    pub failed_by_kind: BTreeMap<String, u64>,
}

impl SchedulerStats {
    /// All queued jobs, blocked or ready.
    pub fn queued(&self) -> usize {
        self.waiting + self.ready
    }
}

impl fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "waiting={} ready={} running={} finished={} failed={} total={} workers={} one_shot={}",
            self.waiting,
            self.ready,
            self.running,
            self.finished,
            self.failed,
            self.total_submitted,
            self.worker_threads,
            self.one_shot_workers
        )
    }
}

/// Immutable record of a job that reached `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub id: JobId,
    pub kind: String,
    pub priority: i32,
    pub failure: JobFailure,
}

impl FailedJob {
    pub fn snapshot(job: &Job, failure: JobFailure) -> Self {
        Self {
            id: job.id(),
            kind: job.kind().to_string(),
            priority: job.priority(),
            failure,
        }
    }
}

/// Historical totals kept by the scheduler.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub finished: u64,
    pub failed: u64,
    pub total_submitted: u64,
    pub failed_by_kind: BTreeMap<String, u64>,
}

impl StatsCounters {
    pub fn record_submitted(&mut self, n: usize) {
        self.total_submitted += n as u64;
    }

    pub fn record_finished(&mut self) {
        self.finished += 1;
    }

    pub fn record_failed(&mut self, kind: &str) {
        self.failed += 1;
        *self.failed_by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }
}

/// Append-only record of failed jobs.
#[derive(Debug, Default)]
pub(crate) struct FailureLog {
    entries: Vec<FailedJob>,
}

impl FailureLog {
    pub fn append(&mut self, entry: FailedJob) {
        self.entries.push(entry);
    }

    pub fn snapshot(&self) -> Vec<FailedJob> {
        self.entries.clone()
    }
}

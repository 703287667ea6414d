// src/exec/worker.rs

//! Worker threads and the registry the scheduler keeps of them.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::dag::Scheduler;
use crate::errors::Interrupted;
use crate::exec::job_runner::run_job;
use crate::job::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    /// Pool member: loops until asked to stop.
    Persistent,
    /// Executes exactly one job, then exits.
    OneShot,
}

/// Snapshot of a live worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub id: WorkerId,
    /// OS thread name.
    pub name: String,
    pub kind: WorkerKind,
    pub current_job: Option<JobId>,
    pub jobs_executed: u64,
    /// Set once the worker was asked to stop; it exits after its current job.
    pub stopping: bool,
}

/// Live workers, guarded by the scheduler lock.
#[derive(Debug, Default)]
pub(crate) struct WorkerRegistry {
    next_id: u64,
    workers: BTreeMap<WorkerId, WorkerInfo>,
}

impl WorkerRegistry {
    pub fn register(&mut self, kind: WorkerKind) -> WorkerInfo {
        self.next_id += 1;
        let id = WorkerId(self.next_id);
        let name = match kind {
            WorkerKind::Persistent => format!("jobsched-worker-{}", self.next_id),
            WorkerKind::OneShot => format!("jobsched-oneshot-{}", self.next_id),
        };
        let info = WorkerInfo {
            id,
            name,
            kind,
            current_job: None,
            jobs_executed: 0,
            stopping: false,
        };
        self.workers.insert(id, info.clone());
        info
    }

    pub fn deregister(&mut self, id: WorkerId) {
        self.workers.remove(&id);
    }

    /// Unknown workers count as stopped.
    pub fn stop_requested(&self, id: WorkerId) -> bool {
        self.workers.get(&id).is_none_or(|w| w.stopping)
    }

    pub fn request_stop(&mut self, kind: WorkerKind) -> usize {
        let mut flagged = 0;
        for w in self.workers.values_mut().filter(|w| w.kind == kind) {
            if !w.stopping {
                w.stopping = true;
                flagged += 1;
            }
        }
        flagged
    }

    pub fn request_stop_all(&mut self) {
        for w in self.workers.values_mut() {
            w.stopping = true;
        }
    }

    pub fn set_idle(&mut self, id: WorkerId) {
        if let Some(w) = self.workers.get_mut(&id) {
            w.current_job = None;
        }
    }

    pub fn assign(&mut self, id: WorkerId, job: JobId) {
        if let Some(w) = self.workers.get_mut(&id) {
            w.current_job = Some(job);
            w.jobs_executed += 1;
        }
    }

    pub fn count(&self, kind: WorkerKind) -> usize {
        self.workers.values().filter(|w| w.kind == kind).count()
    }

    pub fn snapshot(&self, kind: WorkerKind) -> Vec<WorkerInfo> {
        self.workers
            .values()
            .filter(|w| w.kind == kind)
            .cloned()
            .collect()
    }
}

/// Start the OS thread for a registered worker.
pub(crate) fn spawn(scheduler: Scheduler, info: &WorkerInfo) -> io::Result<JoinHandle<()>> {
    let id = info.id;
    let kind = info.kind;
    thread::Builder::new()
        .name(info.name.clone())
        .spawn(move || worker_loop(scheduler, id, kind))
}

/// Take jobs until interrupted (persistent) or once (one-shot).
///
/// Job failures never end the loop; only an interrupted wait does.
fn worker_loop(scheduler: Scheduler, id: WorkerId, kind: WorkerKind) {
    info!(worker = %id, ?kind, "worker started");

    loop {
        let job = match scheduler.next_job_for(id) {
            Ok(job) => job,
            Err(Interrupted) => {
                debug!(worker = %id, "wait interrupted; leaving worker loop");
                break;
            }
        };

        debug!(worker = %id, job = %job.id(), kind = job.kind(), "worker picked up job");
        run_job(&scheduler, &job);

        if kind == WorkerKind::OneShot {
            break;
        }
    }

    scheduler.worker_exited(id);
    info!(worker = %id, "worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_kinds_and_stop_flags() {
        let mut reg = WorkerRegistry::default();
        let a = reg.register(WorkerKind::Persistent);
        let b = reg.register(WorkerKind::OneShot);

        assert_eq!(a.name, "jobsched-worker-1");
        assert_eq!(b.name, "jobsched-oneshot-2");
        assert_eq!(reg.count(WorkerKind::Persistent), 1);
        assert_eq!(reg.count(WorkerKind::OneShot), 1);

        assert_eq!(reg.request_stop(WorkerKind::Persistent), 1);
        assert_eq!(reg.request_stop(WorkerKind::Persistent), 0);
        assert!(reg.stop_requested(a.id));
        assert!(!reg.stop_requested(b.id));

        reg.deregister(a.id);
        assert!(reg.stop_requested(a.id));
        assert!(reg.snapshot(WorkerKind::Persistent).is_empty());
    }
}

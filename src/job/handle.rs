// src/job/handle.rs

//! Shared job handle, identity and failure detail.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::errors::SchedulerError;
use crate::job::body::{FnBody, JobBody};
use crate::job::state::JobState;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-wide unique job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Captured cause of a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    message: String,
    panicked: bool,
}

impl JobFailure {
    /// Render the full error chain (`{:#}`), e.g. `"reading log: file not found"`.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            panicked: false,
        }
    }

    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            message: format!("job panicked: {detail}"),
            panicked: true,
        }
    }

    pub fn dependency_failed(dependency: JobId) -> Self {
        Self {
            message: format!("dependency {dependency} failed"),
            panicked: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn panicked(&self) -> bool {
        self.panicked
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Terminal result of executing a job, reported to the scheduler by whoever
/// ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Finished,
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Finished => JobState::Finished,
            JobOutcome::Failed(_) => JobState::Failed,
        }
    }
}

/// Dependencies are held weakly so that an upstream job is freed once
/// nothing but its dependents refers to it, and mutual dependencies between
/// unsubmitted jobs do not form a reference cycle.
struct Dependency {
    id: JobId,
    job: Weak<Inner>,
}

struct Meta {
    state: JobState,
    priority: i32,
    dependencies: Vec<Dependency>,
    failure: Option<JobFailure>,
}

struct Inner {
    id: JobId,
    kind: String,
    meta: Mutex<Meta>,
    state_changed: Condvar,
    body: Mutex<Box<dyn JobBody>>,
}

/// A unit of schedulable work.
///
/// `Job` is a cheap handle: clones refer to the same job, and equality and
/// hashing go by [`JobId`]. Lower priority values are scheduled sooner; the
/// default priority is 0.
#[derive(Clone)]
pub struct Job {
    inner: Arc<Inner>,
}

impl Job {
    pub fn new(body: impl JobBody) -> Self {
        let kind = body.kind().to_string();
        Self {
            inner: Arc::new(Inner {
                id: JobId::next(),
                kind,
                meta: Mutex::new(Meta {
                    state: JobState::Created,
                    priority: 0,
                    dependencies: Vec::new(),
                    failure: None,
                }),
                state_changed: Condvar::new(),
                body: Mutex::new(Box::new(body)),
            }),
        }
    }

    pub fn from_fn<F>(kind: impl Into<String>, f: F) -> Self
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        Self::new(FnBody::new(kind, f))
    }

    /// Builder-style priority for a freshly created job.
    pub fn with_priority(self, priority: i32) -> Self {
        {
            let mut meta = self.inner.meta.lock();
            if meta.state.is_mutable() {
                meta.priority = priority;
            }
        }
        self
    }

    pub fn id(&self) -> JobId {
        self.inner.id
    }

    pub fn kind(&self) -> &str {
        &self.inner.kind
    }

    pub fn state(&self) -> JobState {
        self.inner.meta.lock().state
    }

    pub fn priority(&self) -> i32 {
        self.inner.meta.lock().priority
    }

    /// Failure detail; only present once the job is `Failed`.
    pub fn failure(&self) -> Option<JobFailure> {
        self.inner.meta.lock().failure.clone()
    }

    /// Dependencies that are still alive somewhere.
    ///
    /// A dependency whose last handle was dropped cannot be queued or
    /// running (the scheduler keeps handles to those), so it is left out
    /// and counts as resolved.
    pub fn dependencies(&self) -> Vec<Job> {
        self.inner
            .meta
            .lock()
            .dependencies
            .iter()
            .filter_map(|d| d.job.upgrade().map(|inner| Job { inner }))
            .collect()
    }

    /// Change the priority.
    ///
    /// If the job is already queued, call
    /// `Scheduler::job_dependencies_changed` (or use `Scheduler::set_priority`)
    /// so the ready queue picks up the new key.
    pub fn set_priority(&self, priority: i32) -> Result<(), SchedulerError> {
        let mut meta = self.inner.meta.lock();
        self.ensure_mutable(&meta)?;
        meta.priority = priority;
        Ok(())
    }

    /// Make this job wait for `dependency` to reach a terminal state.
    ///
    /// Adding the same dependency twice is a no-op.
    pub fn add_dependency(&self, dependency: &Job) -> Result<(), SchedulerError> {
        if dependency.id() == self.id() {
            return Err(SchedulerError::SelfDependency(self.id()));
        }

        let mut meta = self.inner.meta.lock();
        self.ensure_mutable(&meta)?;
        if !meta.dependencies.iter().any(|d| d.id == dependency.id()) {
            meta.dependencies.push(Dependency {
                id: dependency.id(),
                job: Arc::downgrade(&dependency.inner),
            });
        }
        Ok(())
    }

    /// Returns whether `dependency` was present.
    pub fn remove_dependency(&self, dependency: &Job) -> Result<bool, SchedulerError> {
        let mut meta = self.inner.meta.lock();
        self.ensure_mutable(&meta)?;
        let before = meta.dependencies.len();
        meta.dependencies.retain(|d| d.id != dependency.id());
        Ok(meta.dependencies.len() != before)
    }

    /// Block until the job is `Finished` or `Failed`.
    pub fn wait_for_finished(&self) -> JobState {
        let mut meta = self.inner.meta.lock();
        while !meta.state.is_terminal() {
            self.inner.state_changed.wait(&mut meta);
        }
        meta.state
    }

    /// Like [`wait_for_finished`](Self::wait_for_finished), giving up after
    /// `timeout`. Returns `None` if the job is still not terminal.
    pub fn wait_for_finished_timeout(&self, timeout: Duration) -> Option<JobState> {
        let deadline = Instant::now() + timeout;
        let mut meta = self.inner.meta.lock();
        while !meta.state.is_terminal() {
            if self
                .inner
                .state_changed
                .wait_until(&mut meta, deadline)
                .timed_out()
            {
                return meta.state.is_terminal().then_some(meta.state);
            }
        }
        Some(meta.state)
    }

    /// Apply a state transition. Only the scheduler drives transitions.
    pub(crate) fn transition(
        &self,
        next: JobState,
        failure: Option<JobFailure>,
    ) -> Result<(), SchedulerError> {
        let mut meta = self.inner.meta.lock();
        if !meta.state.can_transition_to(next) {
            return Err(SchedulerError::InvalidTransition {
                id: self.id(),
                from: meta.state,
                to: next,
            });
        }

        meta.state = next;
        meta.failure = failure;
        if next.is_terminal() {
            self.inner.state_changed.notify_all();
        }
        Ok(())
    }

    /// Run the body, turning errors and panics into a failed outcome.
    pub(crate) fn execute(&self) -> JobOutcome {
        let mut body = self.inner.body.lock();
        match panic::catch_unwind(AssertUnwindSafe(|| body.run())) {
            Ok(Ok(())) => JobOutcome::Finished,
            Ok(Err(err)) => JobOutcome::Failed(JobFailure::from_error(&err)),
            Err(payload) => JobOutcome::Failed(JobFailure::from_panic(payload.as_ref())),
        }
    }

    fn ensure_mutable(&self, meta: &Meta) -> Result<(), SchedulerError> {
        if meta.state.is_mutable() {
            Ok(())
        } else {
            Err(SchedulerError::JobFrozen {
                id: self.id(),
                state: meta.state,
            })
        }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Job {}

impl std::hash::Hash for Job {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.inner.meta.lock();
        f.debug_struct("Job")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("state", &meta.state)
            .field("priority", &meta.priority)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    fn noop(kind: &str) -> Job {
        Job::from_fn(kind, || Ok(()))
    }

    #[test]
    fn ids_are_unique_and_displayed() {
        let a = noop("a");
        let b = noop("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().to_string(), format!("job-{}", a.id().as_u64()));
    }

    #[test]
    fn dependencies_are_deduplicated_and_removable() {
        let a = noop("a");
        let b = noop("b");

        a.add_dependency(&b).unwrap();
        a.add_dependency(&b).unwrap();
        assert_eq!(a.dependencies(), vec![b.clone()]);

        assert!(a.remove_dependency(&b).unwrap());
        assert!(!a.remove_dependency(&b).unwrap());
        assert!(a.dependencies().is_empty());
    }

    #[test]
    fn dependencies_do_not_keep_jobs_alive() {
        let a = noop("a");
        let b = noop("b");
        a.add_dependency(&b).unwrap();
        b.add_dependency(&a).unwrap();
        assert_eq!(a.dependencies(), vec![b.clone()]);

        let weak_a = Arc::downgrade(&a.inner);
        let weak_b = Arc::downgrade(&b.inner);
        drop(b);
        assert!(weak_b.upgrade().is_none());
        assert!(a.dependencies().is_empty());

        drop(a);
        assert!(weak_a.upgrade().is_none());
    }

    #[test]
    fn self_dependency_is_rejected() {
        let a = noop("a");
        assert!(matches!(
            a.add_dependency(&a),
            Err(SchedulerError::SelfDependency(id)) if id == a.id()
        ));
    }

    #[test]
    fn running_job_is_frozen() {
        let a = noop("a");
        let b = noop("b");
        a.transition(JobState::Queued, None).unwrap();
        a.transition(JobState::Running, None).unwrap();

        assert!(matches!(
            a.add_dependency(&b),
            Err(SchedulerError::JobFrozen { state: JobState::Running, .. })
        ));
        assert!(a.set_priority(3).is_err());
        assert_eq!(a.priority(), 0);
    }

    #[test]
    fn invalid_transition_is_reported() {
        let a = noop("a");
        let err = a.transition(JobState::Finished, None).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTransition {
                from: JobState::Created,
                to: JobState::Finished,
                ..
            }
        ));
    }

    #[test]
    fn execute_captures_errors_and_panics() {
        let ok = noop("ok");
        assert_eq!(ok.execute(), JobOutcome::Finished);

        let err = Job::from_fn("err", || {
            Err(anyhow!("disk full")).context("writing measurement")
        });
        match err.execute() {
            JobOutcome::Failed(f) => {
                assert_eq!(f.message(), "writing measurement: disk full");
                assert!(!f.panicked());
            }
            other => panic!("expected failure, got {other:?}"),
        }

        let boom = Job::from_fn("boom", || panic!("kaboom"));
        match boom.execute() {
            JobOutcome::Failed(f) => {
                assert!(f.panicked());
                assert!(f.message().contains("kaboom"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn wait_with_timeout_returns_none_while_pending() {
        let a = noop("a");
        assert_eq!(a.wait_for_finished_timeout(Duration::from_millis(10)), None);

        a.transition(JobState::Queued, None).unwrap();
        a.transition(JobState::Running, None).unwrap();
        a.transition(JobState::Finished, None).unwrap();
        assert_eq!(
            a.wait_for_finished_timeout(Duration::from_millis(10)),
            Some(JobState::Finished)
        );
        assert_eq!(a.wait_for_finished(), JobState::Finished);
    }

    #[test]
    fn with_priority_sets_initial_priority() {
        let a = noop("a").with_priority(7);
        assert_eq!(a.priority(), 7);
        assert_eq!(a.kind(), "a");
    }
}

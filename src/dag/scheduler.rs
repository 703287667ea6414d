// src/dag/scheduler.rs

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::ready_queue::{OrderKey, ReadyQueue};
use crate::dag::stats::{FailedJob, FailureLog, SchedulerStats, StatsCounters};
use crate::errors::{Interrupted, SchedulerError};
use crate::exec::job_runner::run_job;
use crate::exec::worker::{self, WorkerId, WorkerInfo, WorkerKind, WorkerRegistry};
use crate::job::{Job, JobFailure, JobId, JobOutcome, JobState};
use crate::types::{DependencyFailurePolicy, SchedulerConfig};

/// Read-only view of a queued job, in wait-queue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: JobId,
    pub kind: String,
    pub priority: i32,
    pub sequence: u64,
    /// Eligible to run right now.
    pub ready: bool,
    /// Dependencies that are not terminal yet.
    pub waiting_on: Vec<JobId>,
}

/// Dependency-aware job scheduler.
///
/// `Scheduler` is a handle: clones share the same queue, graph and worker
/// pool. It is responsible for:
/// - admitting jobs and tracking their outstanding dependencies
/// - handing eligible jobs out in `(priority, sequence)` order
/// - promoting dependents when a job reaches a terminal state
/// - recording failures and counters
/// - growing, stopping and shutting down the worker pool
///
/// Every mutation happens under one lock; `take_job` and the workers block
/// on a condition variable tied to it.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

struct Shared {
    config: SchedulerConfig,
    state: Mutex<State>,
    /// Signalled when the ready queue gains jobs or waits get interrupted.
    job_available: Condvar,
    /// Signalled when a worker exits.
    workers_changed: Condvar,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Default)]
struct State {
    graph: DependencyGraph,
    ready: ReadyQueue,
    running: HashSet<JobId>,
    next_sequence: u64,
    counters: StatsCounters,
    failures: FailureLog,
    workers: WorkerRegistry,
    /// Bumped by `stop_execute`; interrupts external `take_job` waits.
    stop_epoch: u64,
    shutting_down: bool,
}

/// Result of checking a job's dependency set against the live graph.
struct Dependencies {
    waiting_on: HashSet<JobId>,
    /// A dependency that already ended up `Failed`, if any.
    failed: Option<JobId>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "creating scheduler");
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State::default()),
                job_available: Condvar::new(),
                workers_changed: Condvar::new(),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Submit a job.
    ///
    /// Every dependency must either be live in this scheduler (queued or
    /// running) or already terminal. Jobs without outstanding dependencies go
    /// straight to the ready queue.
    pub fn enqueue(&self, job: &Job) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        state.ensure_accepting()?;
        state.ensure_submittable(job)?;
        let deps = state.check_dependencies(job)?;

        let cascade = self.cascade_from(&deps);
        let ready = deps.waiting_on.is_empty() && cascade.is_none();
        state.admit(job, deps.waiting_on, ready)?;
        state.counters.record_submitted(1);

        debug!(
            job = %job.id(),
            kind = job.kind(),
            priority = job.priority(),
            ready,
            "job enqueued"
        );

        if let Some(failed) = cascade {
            state.cascade_failure(job.id(), JobFailure::dependency_failed(failed));
        }
        if ready {
            self.shared.job_available.notify_all();
        }
        Ok(())
    }

    /// Submit a batch of jobs that have no unresolved dependencies.
    ///
    /// Dependencies, if any, must already be terminal. The whole batch is
    /// validated before anything is inserted, so either every job is queued
    /// or none is.
    pub fn enqueue_no_dependencies(&self, jobs: &[Job]) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        state.ensure_accepting()?;

        let mut seen = HashSet::new();
        let mut cascades = Vec::new();
        for job in jobs {
            if !seen.insert(job.id()) {
                return Err(SchedulerError::DuplicateJob(job.id()));
            }
            state.ensure_submittable(job)?;
            let deps = state.check_dependencies(job)?;
            if let Some(dependency) = deps.waiting_on.iter().next() {
                return Err(SchedulerError::UnresolvedDependency {
                    job: job.id(),
                    dependency: *dependency,
                });
            }
            cascades.push(self.cascade_from(&deps));
        }

        for (job, cascade) in jobs.iter().zip(&cascades) {
            state.admit(job, HashSet::new(), cascade.is_none())?;
        }
        state.counters.record_submitted(jobs.len());
        for (job, cascade) in jobs.iter().zip(cascades) {
            if let Some(failed) = cascade {
                state.cascade_failure(job.id(), JobFailure::dependency_failed(failed));
            }
        }

        debug!(count = jobs.len(), "batch enqueued without dependencies");
        if !jobs.is_empty() {
            self.shared.job_available.notify_all();
        }
        Ok(())
    }

    /// Withdraw a queued job that has not started.
    ///
    /// The job returns to `Created` and may be submitted again. Jobs that
    /// other queued jobs wait on cannot be withdrawn.
    pub fn dequeue(&self, job: &Job) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        let id = job.id();
        if state.running.contains(&id) {
            return Err(SchedulerError::AlreadyRunning(id));
        }
        if !state.graph.contains(id) {
            return Err(SchedulerError::NotEnqueued(id));
        }
        if state.graph.has_dependents(id) {
            return Err(SchedulerError::HasDependents(id));
        }

        job.transition(JobState::Created, None)?;
        state.graph.remove(id);
        state.ready.remove(id);
        debug!(job = %id, "job dequeued");
        Ok(())
    }

    /// Report the terminal outcome of a running job.
    ///
    /// Called by whoever executed the job (normally a worker). Releases the
    /// job's bookkeeping, resolves its edge in every dependent and promotes
    /// dependents that have nothing left to wait for. Failures are appended
    /// to the failure log.
    pub fn job_state_changed(&self, job: &Job, outcome: JobOutcome) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        let id = job.id();
        if !state.running.contains(&id) {
            return Err(SchedulerError::NotRunning(id));
        }

        let failure = match &outcome {
            JobOutcome::Finished => None,
            JobOutcome::Failed(f) => Some(f.clone()),
        };
        job.transition(outcome.state(), failure.clone())?;
        state.running.remove(&id);

        let dependents = state
            .graph
            .remove(id)
            .map(|removed| removed.dependents)
            .unwrap_or_default();

        let promoted = match failure {
            None => {
                state.counters.record_finished();
                state.release_dependents(id, dependents)
            }
            Some(failure) => {
                state.record_failure(job, failure);
                match self.shared.config.on_dependency_failure {
                    DependencyFailurePolicy::Release => state.release_dependents(id, dependents),
                    DependencyFailurePolicy::Cascade => {
                        for dependent in dependents {
                            state.cascade_failure(dependent, JobFailure::dependency_failed(id));
                        }
                        0
                    }
                }
            }
        };

        debug!(job = %id, state = ?outcome.state(), promoted, "job reached terminal state");
        if promoted > 0 {
            self.shared.job_available.notify_all();
        }
        Ok(())
    }

    /// Recompute eligibility after a queued job's dependency set or priority
    /// changed.
    ///
    /// No-op for running and terminal jobs. On error the scheduler's view of
    /// the job is left as it was.
    pub fn job_dependencies_changed(&self, job: &Job) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        let id = job.id();
        if state.running.contains(&id) || job.state().is_terminal() {
            debug!(job = %id, "dependency change ignored for running/terminal job");
            return Ok(());
        }
        if !state.graph.contains(id) {
            return Err(SchedulerError::NotEnqueued(id));
        }

        let policy = self.shared.config.on_dependency_failure;
        if state.refresh(job, policy)? {
            self.shared.job_available.notify_all();
        }
        Ok(())
    }

    /// Add a dependency to `job` and update the scheduler in one step.
    ///
    /// Unlike `job.add_dependency` followed by `job_dependencies_changed`,
    /// a rejected change (cycle, unknown dependency) leaves the job's own
    /// dependency set untouched.
    pub fn add_dependency(&self, job: &Job, dependency: &Job) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        let id = job.id();

        if dependency.id() == id {
            return Err(SchedulerError::SelfDependency(id));
        }
        if state.graph.would_create_cycle(id, dependency.id()) {
            return Err(SchedulerError::DependencyCycle {
                job: id,
                dependency: dependency.id(),
            });
        }
        if job.dependencies().contains(dependency) {
            return Ok(());
        }

        job.add_dependency(dependency)?;
        if !state.graph.contains(id) || state.running.contains(&id) {
            return Ok(());
        }

        let policy = self.shared.config.on_dependency_failure;
        match state.refresh(job, policy) {
            Ok(promoted) => {
                if promoted {
                    self.shared.job_available.notify_all();
                }
                Ok(())
            }
            Err(err) => {
                let _ = job.remove_dependency(dependency);
                Err(err)
            }
        }
    }

    /// Change a job's priority, re-ordering it if it is already queued.
    pub fn set_priority(&self, job: &Job, priority: i32) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        job.set_priority(priority)?;

        let id = job.id();
        if state.graph.contains(id) && !state.running.contains(&id) {
            let policy = self.shared.config.on_dependency_failure;
            if state.refresh(job, policy)? {
                self.shared.job_available.notify_all();
            }
        }
        Ok(())
    }

    /// Block until a job is eligible and take it, marking it `Running`.
    ///
    /// Returns [`Interrupted`] if `stop_execute()` or `shutdown()` is called
    /// while waiting. The caller must execute the job and report the outcome
    /// through [`job_state_changed`](Self::job_state_changed).
    pub fn take_job(&self) -> Result<Job, Interrupted> {
        let mut state = self.shared.state.lock();
        let epoch = state.stop_epoch;
        self.wait_for_job(&mut state, |s| s.stop_epoch != epoch)
    }

    /// Take exactly `job` if it is in the ready queue right now.
    ///
    /// Never blocks. Used to run a known dependency inline instead of
    /// waiting for a worker to get to it.
    pub fn take_specific_job(&self, job: &Job) -> Result<Job, SchedulerError> {
        let mut state = self.shared.state.lock();
        let id = job.id();
        if state.running.contains(&id) {
            return Err(SchedulerError::AlreadyRunning(id));
        }
        if !state.graph.contains(id) {
            return Err(SchedulerError::NotEnqueued(id));
        }
        if !state.ready.remove(id) {
            return Err(SchedulerError::NotReady(id));
        }

        state.start_running(job)?;
        debug!(job = %id, "job taken out of order");
        Ok(job.clone())
    }

    /// Take `job` out of the ready queue and execute it on the calling
    /// thread, with the same failure handling as a worker.
    pub fn run_job_now(&self, job: &Job) -> Result<JobState, SchedulerError> {
        let job = self.take_specific_job(job)?;
        Ok(run_job(self, &job))
    }

    pub(crate) fn next_job_for(&self, worker: WorkerId) -> Result<Job, Interrupted> {
        let mut state = self.shared.state.lock();
        state.workers.set_idle(worker);
        let job = self.wait_for_job(&mut state, |s| s.workers.stop_requested(worker))?;
        state.workers.assign(worker, job.id());
        Ok(job)
    }

    fn wait_for_job(
        &self,
        state: &mut MutexGuard<'_, State>,
        interrupted: impl Fn(&State) -> bool,
    ) -> Result<Job, Interrupted> {
        loop {
            if state.shutting_down || interrupted(&**state) {
                return Err(Interrupted);
            }
            if let Some(job) = state.pop_ready() {
                return Ok(job);
            }
            self.shared.job_available.wait(state);
        }
    }

    /// Start `n` more persistent workers, on top of any already running.
    pub fn start_execute(&self, n: usize) -> Result<(), SchedulerError> {
        for _ in 0..n {
            self.spawn_worker(WorkerKind::Persistent)?;
        }
        info!(
            added = n,
            workers = self.shared.state.lock().workers.count(WorkerKind::Persistent),
            "persistent workers started"
        );
        Ok(())
    }

    /// Ask every persistent worker to exit after its current job.
    ///
    /// Running jobs are never interrupted. Threads blocked in `take_job` are
    /// woken with [`Interrupted`].
    pub fn stop_execute(&self) {
        let mut state = self.shared.state.lock();
        let flagged = state.workers.request_stop(WorkerKind::Persistent);
        state.stop_epoch += 1;
        self.shared.job_available.notify_all();
        info!(workers = flagged, "stop requested for persistent workers");
    }

    /// Whether at least one persistent worker thread is still alive.
    pub fn is_executing(&self) -> bool {
        self.shared.state.lock().workers.count(WorkerKind::Persistent) > 0
    }

    /// Start a worker that executes exactly one job and exits.
    pub fn start_one_shot_worker(&self) -> Result<(), SchedulerError> {
        let id = self.spawn_worker(WorkerKind::OneShot)?;
        debug!(worker = %id, "one-shot worker started");
        Ok(())
    }

    /// Live persistent workers. One-shot workers are not listed.
    pub fn worker_threads(&self) -> Vec<WorkerInfo> {
        self.shared.state.lock().workers.snapshot(WorkerKind::Persistent)
    }

    /// Block until no persistent worker is alive, or `timeout` elapses.
    /// Returns `true` if the pool drained.
    pub fn wait_for_workers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.workers.count(WorkerKind::Persistent) > 0 {
            if self
                .shared
                .workers_changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.workers.count(WorkerKind::Persistent) == 0;
            }
        }
        true
    }

    /// Stop for good: reject further submissions, interrupt every wait,
    /// stop all workers (one-shot included) and join their threads.
    ///
    /// Jobs still queued stay `Queued`. Running jobs are allowed to finish.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.shutting_down {
                info!(
                    queued = state.graph.len() - state.running.len(),
                    running = state.running.len(),
                    "scheduler shutting down"
                );
            }
            state.shutting_down = true;
            state.workers.request_stop_all();
            state.stop_epoch += 1;
            self.shared.job_available.notify_all();
        }

        let handles = std::mem::take(&mut *self.shared.handles.lock());
        let me = thread::current().id();
        for handle in handles {
            if handle.thread().id() == me {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }

    pub(crate) fn worker_exited(&self, id: WorkerId) {
        let mut state = self.shared.state.lock();
        state.workers.deregister(id);
        self.shared.workers_changed.notify_all();
    }

    fn spawn_worker(&self, kind: WorkerKind) -> Result<WorkerId, SchedulerError> {
        let info = {
            let mut state = self.shared.state.lock();
            state.ensure_accepting()?;
            state.workers.register(kind)
        };

        match worker::spawn(self.clone(), &info) {
            Ok(handle) => {
                let mut handles = self.shared.handles.lock();
                // `shutdown` sets the flag before it drains `handles`.
                if self.shared.state.lock().shutting_down {
                    drop(handles);
                    if handle.join().is_err() {
                        warn!(worker = %info.id, "worker thread panicked");
                    }
                    return Err(SchedulerError::ShuttingDown);
                }
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                Ok(info.id)
            }
            Err(err) => {
                self.worker_exited(info.id);
                Err(SchedulerError::WorkerSpawn(err))
            }
        }
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        let ready = state.ready.len();
        let running = state.running.len();
        SchedulerStats {
            waiting: state.graph.len() - running - ready,
            ready,
            running,
            finished: state.counters.finished,
            failed: state.counters.failed,
            total_submitted: state.counters.total_submitted,
            worker_threads: state.workers.count(WorkerKind::Persistent),
            one_shot_workers: state.workers.count(WorkerKind::OneShot),
            failed_by_kind: state.counters.failed_by_kind.clone(),
        }
    }

    /// Copy of the failure log, oldest first.
    pub fn failed_queue(&self) -> Vec<FailedJob> {
        self.shared.state.lock().failures.snapshot()
    }

    /// Every queued job: ready ones in dispatch order, then blocked ones by
    /// submission order.
    pub fn wait_queue(&self) -> Vec<QueuedJob> {
        let state = self.shared.state.lock();
        let mut out: Vec<QueuedJob> = state
            .ready
            .iter()
            .filter_map(|(key, id)| {
                let job = state.graph.job(id)?;
                Some(QueuedJob {
                    id,
                    kind: job.kind().to_string(),
                    priority: key.priority,
                    sequence: key.sequence,
                    ready: true,
                    waiting_on: Vec::new(),
                })
            })
            .collect();

        let mut blocked: Vec<QueuedJob> = state
            .graph
            .ids()
            .filter(|id| !state.ready.contains(*id) && !state.running.contains(id))
            .filter_map(|id| {
                let job = state.graph.job(id)?;
                Some(QueuedJob {
                    id,
                    kind: job.kind().to_string(),
                    priority: job.priority(),
                    sequence: state.graph.sequence(id)?,
                    ready: false,
                    waiting_on: state.graph.dependencies_of(id),
                })
            })
            .collect();
        blocked.sort_by_key(|q| q.sequence);

        out.append(&mut blocked);
        out
    }

    fn cascade_from(&self, deps: &Dependencies) -> Option<JobId> {
        match self.shared.config.on_dependency_failure {
            DependencyFailurePolicy::Cascade => deps.failed,
            DependencyFailurePolicy::Release => None,
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.shared.config)
            .field("stats", &self.scheduler_stats())
            .finish_non_exhaustive()
    }
}

impl State {
    fn ensure_accepting(&self) -> Result<(), SchedulerError> {
        if self.shutting_down {
            Err(SchedulerError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    fn ensure_submittable(&self, job: &Job) -> Result<(), SchedulerError> {
        let id = job.id();
        if self.graph.contains(id) || self.running.contains(&id) {
            return Err(SchedulerError::DuplicateJob(id));
        }
        match job.state() {
            JobState::Created => Ok(()),
            state => Err(SchedulerError::NotSubmittable { id, state }),
        }
    }

    /// Classify a job's dependencies into outstanding (live here) and
    /// resolved (terminal, or dropped by every holder). Anything else is a
    /// malformed reference.
    fn check_dependencies(&self, job: &Job) -> Result<Dependencies, SchedulerError> {
        let mut deps = Dependencies {
            waiting_on: HashSet::new(),
            failed: None,
        };

        for dep in job.dependencies() {
            if dep.id() == job.id() {
                return Err(SchedulerError::SelfDependency(job.id()));
            }
            if self.graph.contains(dep.id()) {
                deps.waiting_on.insert(dep.id());
                continue;
            }
            match dep.state() {
                JobState::Finished => {}
                JobState::Failed => {
                    deps.failed.get_or_insert(dep.id());
                }
                _ => {
                    return Err(SchedulerError::UnknownDependency {
                        job: job.id(),
                        dependency: dep.id(),
                    });
                }
            }
        }

        Ok(deps)
    }

    fn admit(&mut self, job: &Job, waiting_on: HashSet<JobId>, ready: bool) -> Result<(), SchedulerError> {
        job.transition(JobState::Queued, None)?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.graph.insert(job.clone(), sequence, waiting_on);
        if ready {
            self.ready.push(
                job.id(),
                OrderKey {
                    priority: job.priority(),
                    sequence,
                },
            );
        }
        Ok(())
    }

    fn pop_ready(&mut self) -> Option<Job> {
        while let Some(id) = self.ready.pop() {
            let Some(job) = self.graph.job(id).cloned() else {
                warn!(job = %id, "ready job missing from dependency graph; dropping");
                continue;
            };
            match self.start_running(&job) {
                Ok(()) => return Some(job),
                Err(err) => warn!(job = %id, error = %err, "could not start ready job"),
            }
        }
        None
    }

    fn start_running(&mut self, job: &Job) -> Result<(), SchedulerError> {
        job.transition(JobState::Running, None)?;
        self.running.insert(job.id());
        Ok(())
    }

    /// Resolve `resolved` in each dependent; returns how many were promoted.
    fn release_dependents(&mut self, resolved: JobId, dependents: Vec<JobId>) -> usize {
        let mut promoted = 0;
        for dependent in dependents {
            if !self.graph.resolve(dependent, resolved) {
                continue;
            }
            let Some(key) = self.order_key(dependent) else {
                continue;
            };
            if self.ready.push(dependent, key) {
                debug!(job = %dependent, after = %resolved, "dependencies resolved; job is ready");
                promoted += 1;
            }
        }
        promoted
    }

    /// Fail a queued job without running it, then everything waiting on it.
    fn cascade_failure(&mut self, root: JobId, failure: JobFailure) {
        let mut stack = vec![(root, failure)];

        while let Some((id, failure)) = stack.pop() {
            if self.running.contains(&id) {
                continue;
            }
            let Some(removed) = self.graph.remove(id) else {
                continue;
            };
            self.ready.remove(id);

            if let Err(err) = removed.job.transition(JobState::Failed, Some(failure.clone())) {
                warn!(job = %id, error = %err, "could not fail dependent");
                continue;
            }
            warn!(
                job = %id,
                kind = removed.job.kind(),
                error = %failure,
                "failing job without running it"
            );
            self.record_failure(&removed.job, failure);

            stack.extend(
                removed
                    .dependents
                    .into_iter()
                    .map(|d| (d, JobFailure::dependency_failed(id))),
            );
        }
    }

    fn record_failure(&mut self, job: &Job, failure: JobFailure) {
        self.counters.record_failed(job.kind());
        self.failures.append(FailedJob::snapshot(job, failure));
    }

    /// Re-read a queued job's dependencies and priority. Returns whether the
    /// job was (re-)inserted into the ready queue.
    fn refresh(&mut self, job: &Job, policy: DependencyFailurePolicy) -> Result<bool, SchedulerError> {
        let id = job.id();
        let deps = self.check_dependencies(job)?;
        for dep in &deps.waiting_on {
            if self.graph.would_create_cycle(id, *dep) {
                return Err(SchedulerError::DependencyCycle {
                    job: id,
                    dependency: *dep,
                });
            }
        }

        self.graph.replace_dependencies(id, deps.waiting_on);
        self.ready.remove(id);

        if let (DependencyFailurePolicy::Cascade, Some(failed)) = (policy, deps.failed) {
            self.cascade_failure(id, JobFailure::dependency_failed(failed));
            return Ok(false);
        }

        if self.graph.outstanding(id) == Some(0) {
            if let Some(key) = self.order_key(id) {
                return Ok(self.ready.push(id, key));
            }
        }
        Ok(false)
    }

    fn order_key(&self, id: JobId) -> Option<OrderKey> {
        let job = self.graph.job(id)?;
        Some(OrderKey {
            priority: job.priority(),
            sequence: self.graph.sequence(id)?,
        })
    }
}

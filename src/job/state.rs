// src/job/state.rs

//! Job lifecycle states.

/// Lifecycle state of a [`Job`](crate::job::Job).
///
/// The regular path is `Created -> Queued -> Running -> Finished | Failed`.
/// Two side transitions exist:
/// - `Queued -> Created` when a job is withdrawn with `Scheduler::dequeue`.
/// - `Queued -> Failed` when an upstream failure is cascaded to dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Created,
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    /// `Finished` or `Failed`; no further transitions happen from here.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Finished | JobState::Failed)
    }

    /// Whether the dependency set and priority may still be changed.
    pub fn is_mutable(self) -> bool {
        matches!(self, JobState::Created | JobState::Queued)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;

        matches!(
            (self, next),
            (Created, Queued)
                | (Queued, Running)
                | (Queued, Created)
                | (Queued, Failed)
                | (Running, Finished)
                | (Running, Failed)
        )
    }
}

// src/recording.rs

//! Job bodies that report what happened to them, for driving the scheduler
//! from tests without shell commands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use parking_lot::{Condvar, Mutex};

use jobsched::job::Job;

/// Shared, ordered log of labels written by test jobs.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

#[derive(Default)]
struct RecorderInner {
    events: Mutex<Vec<String>>,
    changed: Condvar,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: impl Into<String>) {
        self.inner.events.lock().push(label.into());
        self.inner.changed.notify_all();
    }

    pub fn events(&self) -> Vec<String> {
        self.inner.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until at least `n` events were recorded. Returns `false` on
    /// timeout.
    pub fn wait_for_len(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.inner.events.lock();
        while events.len() < n {
            if self
                .inner
                .changed
                .wait_until(&mut events, deadline)
                .timed_out()
            {
                return events.len() >= n;
            }
        }
        true
    }
}

/// One-way latch that test jobs can block on.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (open, cv) = &*self.inner;
        *open.lock() = true;
        cv.notify_all();
    }

    pub fn wait(&self) {
        let (open, cv) = &*self.inner;
        let mut open = open.lock();
        while !*open {
            cv.wait(&mut open);
        }
    }
}

/// Job that records `label` and finishes.
pub fn recording_job(label: &str, recorder: &Recorder) -> Job {
    let label = label.to_string();
    let recorder = recorder.clone();
    Job::from_fn("test", move || {
        recorder.record(label.clone());
        Ok(())
    })
}

/// Job that records `label` and fails with `message`.
pub fn failing_job(label: &str, message: &str, recorder: &Recorder) -> Job {
    let label = label.to_string();
    let message = message.to_string();
    let recorder = recorder.clone();
    Job::from_fn("test", move || {
        recorder.record(label.clone());
        bail!("{}", message)
    })
}

/// Job that panics with `message`.
pub fn panicking_job(message: &str) -> Job {
    let message = message.to_string();
    Job::from_fn("test", move || -> anyhow::Result<()> { panic!("{}", message) })
}

/// Job that records `start:<label>`, blocks until `gate` opens, then
/// records `label`.
pub fn gated_job(label: &str, recorder: &Recorder, gate: &Gate) -> Job {
    let label = label.to_string();
    let recorder = recorder.clone();
    let gate = gate.clone();
    Job::from_fn("test", move || {
        recorder.record(format!("start:{label}"));
        gate.wait();
        recorder.record(label.clone());
        Ok(())
    })
}

// src/job/body.rs

//! The executable part of a job.

use anyhow::Result;

/// Work performed by a job.
///
/// Returning `Err` (or panicking) marks the job `Failed`; returning `Ok`
/// marks it `Finished`. The body runs on exactly one thread at a time and may
/// block for as long as it needs.
pub trait JobBody: Send + 'static {
    fn run(&mut self) -> Result<()>;

    /// Label used in failure statistics and logs.
    fn kind(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning a closure into a [`JobBody`].
pub struct FnBody<F> {
    kind: String,
    f: F,
}

impl<F> FnBody<F>
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    pub fn new(kind: impl Into<String>, f: F) -> Self {
        Self {
            kind: kind.into(),
            f,
        }
    }
}

impl<F> JobBody for FnBody<F>
where
    F: FnMut() -> Result<()> + Send + 'static,
{
    fn run(&mut self) -> Result<()> {
        (self.f)()
    }

    fn kind(&self) -> &str {
        &self.kind
    }
}

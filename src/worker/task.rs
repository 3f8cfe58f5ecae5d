//! Job executors: the seam between the scheduler and the processing engine.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use serde::Serialize;
use tracing::debug;
use crate::core::{JobDescriptor, JobOutput};
use crate::worker::{JobError, JobOutcome};

/// Per-job lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the next state, or `None` when the transition is not allowed.
    pub fn advance(self, next: JobState) -> Option<JobState> {
        match (self, next) {
            (Self::Pending, Self::Running) => Some(next),
            (Self::Running, Self::Completed | Self::Failed) => Some(next),
            _ => None,
        }
    }
}

/// Runs one job to completion on a blocking thread.
///
/// Implementations convert engine errors to [`JobError`]; panics are caught
/// by the worker pool as well.
pub trait JobExecutor: Send + Sync + 'static {
    fn execute(&self, descriptor: &JobDescriptor) -> JobOutcome<JobOutput>;
}

impl<F> JobExecutor for F
where
    F: Fn(&JobDescriptor) -> JobOutcome<JobOutput> + Send + Sync + 'static,
{
    fn execute(&self, descriptor: &JobDescriptor) -> JobOutcome<JobOutput> {
        self(descriptor)
    }
}

/// An engine instance that performs the decode, transform and encode work
/// for a single job.
pub trait ProcessorHandle {
    fn run_job(&mut self, descriptor: &JobDescriptor) -> JobOutcome<JobOutput>;

    /// Releases native resources. Called once, on every exit path.
    fn close(&mut self) {}
}

/// Closes the wrapped handle when dropped.
struct HandleGuard<H: ProcessorHandle>(H);

impl<H: ProcessorHandle> Drop for HandleGuard<H> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Executor that opens a fresh [`ProcessorHandle`] for each job and closes it
/// before returning, whether the job succeeded, failed or panicked.
pub struct HandleExecutor<F> {
    factory: F,
}

impl<F, H> HandleExecutor<F>
where
    F: Fn() -> JobOutcome<H> + Send + Sync + 'static,
    H: ProcessorHandle,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F, H> JobExecutor for HandleExecutor<F>
where
    F: Fn() -> JobOutcome<H> + Send + Sync + 'static,
    H: ProcessorHandle,
{
    fn execute(&self, descriptor: &JobDescriptor) -> JobOutcome<JobOutput> {
        let mut guard = HandleGuard((self.factory)()?);
        guard.0.run_job(descriptor)
    }
}

/// Shared flag checked by [`Cancellable`] at job entry.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wraps an executor so jobs that have not started yet fail fast once the
/// flag is set. Jobs already running are left alone.
pub struct Cancellable<E> {
    inner: E,
    flag: CancellationFlag,
}

impl<E: JobExecutor> Cancellable<E> {
    pub fn new(inner: E, flag: CancellationFlag) -> Self {
        Self { inner, flag }
    }
}

impl<E: JobExecutor> JobExecutor for Cancellable<E> {
    fn execute(&self, descriptor: &JobDescriptor) -> JobOutcome<JobOutput> {
        if self.flag.is_cancelled() {
            debug!("Skipping {}: batch cancelled", descriptor.id);
            return Err(JobError::Cancelled);
        }
        self.inner.execute(descriptor)
    }
}

/// Calls the executor, turning a panic into [`JobError::Panicked`].
pub(crate) fn execute_guarded(executor: &dyn JobExecutor, descriptor: &JobDescriptor) -> JobOutcome<JobOutput> {
    match catch_unwind(AssertUnwindSafe(|| executor.execute(descriptor))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

mod pool;
mod task;
mod error;

pub use pool::WorkerPool;
pub use task::{
    CancellationFlag, Cancellable, HandleExecutor, JobExecutor, JobState, ProcessorHandle,
};
pub use error::{JobError, JobErrorKind, JobOutcome};

// Module declarations in dependency order
pub mod utils;
pub mod worker;
pub mod core;
pub mod processing;
pub mod report;

// Public exports for external consumers
pub use core::{
    ChunkProgress, JobDescriptor, JobOptions, JobOutput, JobResult, LogReporter, NoopReporter,
    OutputTarget, ProgressReporter, build_descriptors,
};
pub use processing::{BatchConfig, BatchProcessor, BatchSummary, ImageProcessor, image_executor, run_batch};
pub use report::SummaryReport;
pub use utils::{BatchError, BatchResult, ConfigurationError, discover_inputs};
pub use worker::{
    CancellationFlag, Cancellable, HandleExecutor, JobError, JobErrorKind, JobExecutor, JobOutcome,
    ProcessorHandle,
};

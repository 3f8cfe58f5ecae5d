//! Core job types and progress plumbing.
//!
//! - [`JobDescriptor`]: one unit of conversion work
//! - [`JobOptions`]: typed per-job processing options
//! - [`JobResult`]: outcome of a job, produced exactly once per descriptor
//! - [`ProgressReporter`]: receives chunk and job progress events

mod types;
mod task;
mod progress;

pub use types::{
    JobOptions, JobOutput, JobResult, JpegPreset, OutputArtifact, OutputTarget,
    PassthroughValue, PngCompression, ResizeMode, ResizeSettings, Resolution,
};
pub use task::{JobDescriptor, build_descriptors};
pub use progress::{
    ChunkProgress, LogReporter, NoopReporter, ProgressDispatcher, ProgressReporter, ProgressSink,
};

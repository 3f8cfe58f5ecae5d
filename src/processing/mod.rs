pub mod batch;
pub mod engine;

pub use batch::{BatchConfig, BatchProcessor, BatchSummary, ResultAggregator, run_batch};
pub use engine::{ImageProcessor, image_executor};

mod config;
mod metrics;
mod processor;

pub use config::BatchConfig;
pub use metrics::{BatchSummary, ResultAggregator};
pub use processor::{BatchProcessor, BatchProcessorBuilder, run_batch};

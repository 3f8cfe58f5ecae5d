//! Error types for the batch engine.
//!
//! Batch-level errors are fatal and surface to the caller before (or instead
//! of) a summary. Per-job errors live in [`crate::worker::JobError`] and are
//! never propagated past the scheduler.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use serde::Serialize;

/// Problems with the batch request itself. Raised before any job runs.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConfigurationError {
    /// Concurrency limit below one
    #[error("Invalid concurrency limit: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    /// The batch was built without a job executor
    #[error("No job executor supplied")]
    MissingExecutor,

    /// A descriptor is structurally unusable
    #[error("Malformed descriptor at index {index}: {reason}")]
    MalformedDescriptor { index: usize, reason: String },

    /// An option value outside its accepted range
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Main error type for batch-level failures.
#[derive(Error, Debug, Serialize)]
pub enum BatchError {
    /// The batch request was rejected
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Counters disagree at finalize time; indicates a bookkeeping bug
    #[error(
        "Aggregation invariant violated: succeeded ({succeeded}) + failed ({failed}) and results ({recorded}) must all equal total ({total})"
    )]
    AggregationInvariant {
        total: usize,
        succeeded: usize,
        failed: usize,
        recorded: usize,
    },

    /// File IO error outside of any single job
    #[error("IO error: {0}")]
    IO(String),

    /// Config file could not be read or parsed
    #[error("Config file error ({}): {message}", path.display())]
    ConfigFile { path: PathBuf, message: String },
}

/// Convenience result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

impl BatchError {
    pub fn io<T: Into<String>>(msg: T) -> Self {
        Self::IO(msg.into())
    }

    pub fn config_file(path: impl Into<PathBuf>, msg: impl ToString) -> Self {
        Self::ConfigFile {
            path: path.into(),
            message: msg.to_string(),
        }
    }
}

impl ConfigurationError {
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            index,
            reason: reason.into(),
        }
    }

    pub fn option(msg: impl Into<String>) -> Self {
        Self::InvalidOption(msg.into())
    }
}

impl From<io::Error> for BatchError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_convert_into_batch_errors() {
        let err: BatchError = ConfigurationError::InvalidConcurrency(0).into();
        assert!(matches!(
            err,
            BatchError::Configuration(ConfigurationError::InvalidConcurrency(0))
        ));
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid concurrency limit: 0. Must be at least 1"
        );
    }

    #[test]
    fn malformed_descriptor_message_names_index() {
        let err = ConfigurationError::malformed(4, "empty id");
        assert_eq!(err.to_string(), "Malformed descriptor at index 4: empty id");
    }
}

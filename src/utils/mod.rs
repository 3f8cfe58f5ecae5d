pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;

pub use error::{BatchError, BatchResult, ConfigurationError};
pub use validation::{validate_concurrency, validate_descriptors};
pub use formats::{DEFAULT_INPUT_EXTENSIONS, OutputFormat, has_extension};
pub use fs::{discover_inputs, ensure_dir};

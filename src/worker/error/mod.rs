use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable category label for a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobErrorKind {
    Open,
    Decode,
    Transform,
    Encode,
    Io,
    Cancelled,
    Panicked,
    Other,
}

impl JobErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Decode => "decode",
            Self::Transform => "transform",
            Self::Encode => "encode",
            Self::Io => "io",
            Self::Cancelled => "cancelled",
            Self::Panicked => "panicked",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single job. Recovered at the batch level by turning it into
/// a `JobResult::Failure`.
///
/// The display string is the bare message so that callers can match on
/// exactly what the engine reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("{0}")]
    Open(String),

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Transform(String),

    #[error("{0}")]
    Encode(String),

    #[error("{0}")]
    Io(String),

    #[error("Job cancelled before start")]
    Cancelled,

    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

pub type JobOutcome<T> = Result<T, JobError>;

impl JobError {
    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn kind(&self) -> JobErrorKind {
        match self {
            Self::Open(_) => JobErrorKind::Open,
            Self::Decode(_) => JobErrorKind::Decode,
            Self::Transform(_) => JobErrorKind::Transform,
            Self::Encode(_) => JobErrorKind::Encode,
            Self::Io(_) => JobErrorKind::Io,
            Self::Cancelled => JobErrorKind::Cancelled,
            Self::Panicked(_) => JobErrorKind::Panicked,
            Self::Other(_) => JobErrorKind::Other,
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Io(format!("IO error during processing: {}", err))
    }
}

impl From<image::ImageError> for JobError {
    fn from(err: image::ImageError) -> Self {
        use image::ImageError;
        match err {
            ImageError::Decoding(e) => JobError::Decode(e.to_string()),
            ImageError::Encoding(e) => JobError::Encode(e.to_string()),
            ImageError::IoError(e) => e.into(),
            other => JobError::Other(other.to_string()),
        }
    }
}

//! Core types for job options and per-job results.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::utils::{ConfigurationError, OutputFormat};
use crate::worker::{JobError, JobErrorKind};

fn default_jpeg_quality() -> u8 {
    OutputFormat::Jpeg.default_quality()
}

fn default_thumbnail_quality() -> u8 {
    OutputFormat::Thumbnail.default_quality()
}

fn default_thumbnail_edge() -> u32 {
    320
}

/// PNG compression effort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// One artifact the engine should write for a job.
///
/// Each variant carries only the options that make sense for its format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputTarget {
    Jpeg {
        #[serde(default = "default_jpeg_quality")]
        quality: u8,
    },
    Png {
        #[serde(default)]
        compression: PngCompression,
    },
    Tiff,
    Ppm,
    #[serde(rename = "webp")]
    WebP,
    Thumbnail {
        #[serde(default = "default_thumbnail_edge")]
        max_edge: u32,
        #[serde(default = "default_thumbnail_quality")]
        quality: u8,
    },
}

impl OutputTarget {
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Jpeg { .. } => OutputFormat::Jpeg,
            Self::Png { .. } => OutputFormat::Png,
            Self::Tiff => OutputFormat::Tiff,
            Self::Ppm => OutputFormat::Ppm,
            Self::WebP => OutputFormat::WebP,
            Self::Thumbnail { .. } => OutputFormat::Thumbnail,
        }
    }

    pub fn label(&self) -> &'static str {
        self.format().label()
    }

    /// Suffix appended to the input stem so targets sharing an extension do not collide
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Thumbnail { .. } => "_thumb",
            _ => "",
        }
    }

    /// Checks quality and size bounds.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            Self::Jpeg { quality } | Self::Thumbnail { quality, .. }
                if *quality == 0 || *quality > 100 =>
            {
                Err(ConfigurationError::option(format!(
                    "Invalid quality value: {}. Must be between 1 and 100", quality
                )))
            }
            Self::Thumbnail { max_edge: 0, .. } => {
                Err(ConfigurationError::option("Thumbnail edge cannot be 0"))
            }
            _ => Ok(()),
        }
    }
}

impl From<OutputFormat> for OutputTarget {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Jpeg => Self::Jpeg { quality: default_jpeg_quality() },
            OutputFormat::Png => Self::Png { compression: PngCompression::Default },
            OutputFormat::Tiff => Self::Tiff,
            OutputFormat::Ppm => Self::Ppm,
            OutputFormat::WebP => Self::WebP,
            OutputFormat::Thumbnail => Self::Thumbnail {
                max_edge: default_thumbnail_edge(),
                quality: default_thumbnail_quality(),
            },
        }
    }
}

impl FromStr for OutputTarget {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<OutputFormat>().map(Self::from)
    }
}

/// Which edge a resize targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    #[default]
    None,
    Width,
    Height,
    Longest,
    Shortest,
}

/// Resize settings for image dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSettings {
    #[serde(default)]
    pub mode: ResizeMode,
    /// Target size in pixels for the selected edge
    #[serde(default)]
    pub size: Option<u32>,
}

impl ResizeSettings {
    pub fn width(size: u32) -> Self {
        Self { mode: ResizeMode::Width, size: Some(size) }
    }
}

/// Engine-specific option value passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PassthroughValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Named JPEG conversion presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JpegPreset {
    /// 1920px wide, quality 80
    Web,
    /// Original size, quality 95
    Print,
    /// Original size, quality 98
    Archive,
    /// 800px wide, quality 85
    Thumbnail,
}

impl JpegPreset {
    pub fn quality(&self) -> u8 {
        match self {
            Self::Web => 80,
            Self::Print => 95,
            Self::Archive => 98,
            Self::Thumbnail => 85,
        }
    }

    pub fn resize(&self) -> ResizeSettings {
        match self {
            Self::Web => ResizeSettings::width(1920),
            Self::Thumbnail => ResizeSettings::width(800),
            Self::Print | Self::Archive => ResizeSettings::default(),
        }
    }

    /// Options producing a single JPEG output with this preset's settings.
    pub fn options(&self) -> JobOptions {
        JobOptions {
            outputs: vec![OutputTarget::Jpeg { quality: self.quality() }],
            resize: self.resize(),
            passthrough: BTreeMap::new(),
        }
    }
}

impl FromStr for JpegPreset {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "print" => Ok(Self::Print),
            "archive" => Ok(Self::Archive),
            "thumbnail" | "thumb" => Ok(Self::Thumbnail),
            other => Err(ConfigurationError::option(format!("Unknown preset: {}", other))),
        }
    }
}

/// Processing options for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Artifacts to write, in order
    pub outputs: Vec<OutputTarget>,
    #[serde(default)]
    pub resize: ResizeSettings,
    /// Keys the engine may understand but the core does not interpret
    #[serde(default)]
    pub passthrough: BTreeMap<String, PassthroughValue>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            outputs: vec![OutputTarget::Tiff, OutputTarget::from(OutputFormat::Thumbnail)],
            resize: ResizeSettings::default(),
            passthrough: BTreeMap::new(),
        }
    }
}

/// A file written by a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputArtifact {
    pub label: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Pixel dimensions of a decoded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

/// What an executor reports back for a job that succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutput {
    pub outputs: Vec<OutputArtifact>,
    pub input_size_bytes: u64,
    /// Camera or source identifier, when the engine can tell
    pub source_tag: Option<String>,
    pub resolution: Option<Resolution>,
}

/// Outcome of a single job, produced exactly once per descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum JobResult {
    #[serde(rename_all = "camelCase")]
    Success {
        id: String,
        outputs: Vec<OutputArtifact>,
        processing_time_ms: u64,
        input_size_bytes: u64,
        source_tag: Option<String>,
        resolution: Option<Resolution>,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        id: String,
        error_kind: JobErrorKind,
        error_message: String,
        processing_time_ms: u64,
    },
}

impl JobResult {
    pub fn success(id: impl Into<String>, output: JobOutput, processing_time_ms: u64) -> Self {
        Self::Success {
            id: id.into(),
            outputs: output.outputs,
            processing_time_ms,
            input_size_bytes: output.input_size_bytes,
            source_tag: output.source_tag,
            resolution: output.resolution,
        }
    }

    pub fn failure(id: impl Into<String>, error: &JobError, processing_time_ms: u64) -> Self {
        Self::Failure {
            id: id.into(),
            error_kind: error.kind(),
            error_message: error.to_string(),
            processing_time_ms,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn processing_time_ms(&self) -> u64 {
        match self {
            Self::Success { processing_time_ms, .. } | Self::Failure { processing_time_ms, .. } => {
                *processing_time_ms
            }
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failure { error_message, .. } => Some(error_message),
            Self::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_targets_deserialize_from_toml_tables() {
        #[derive(Deserialize)]
        struct Wrapper {
            outputs: Vec<OutputTarget>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            outputs = [
                { format = "tiff" },
                { format = "jpeg", quality = 70 },
                { format = "thumbnail", max_edge = 200 },
                { format = "webp" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.outputs,
            vec![
                OutputTarget::Tiff,
                OutputTarget::Jpeg { quality: 70 },
                OutputTarget::Thumbnail { max_edge: 200, quality: 80 },
                OutputTarget::WebP,
            ]
        );
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        assert!(OutputTarget::Jpeg { quality: 0 }.validate().is_err());
        assert!(OutputTarget::Thumbnail { max_edge: 10, quality: 101 }.validate().is_err());
        assert!(OutputTarget::Thumbnail { max_edge: 0, quality: 80 }.validate().is_err());
        assert!(OutputTarget::Jpeg { quality: 100 }.validate().is_ok());
    }

    #[test]
    fn presets_match_their_profiles() {
        let web = JpegPreset::Web.options();
        assert_eq!(web.outputs, vec![OutputTarget::Jpeg { quality: 80 }]);
        assert_eq!(web.resize, ResizeSettings::width(1920));

        let archive = JpegPreset::Archive.options();
        assert_eq!(archive.outputs, vec![OutputTarget::Jpeg { quality: 98 }]);
        assert_eq!(archive.resize.mode, ResizeMode::None);
    }

    #[test]
    fn passthrough_values_keep_their_type() {
        let opts: JobOptions = serde_json::from_str(
            r#"{"outputs":[{"format":"ppm"}],"passthrough":{"bright":1.1,"half_size":true,"bps":16,"camera":"auto"}}"#,
        )
        .unwrap();
        assert_eq!(opts.passthrough["bright"], PassthroughValue::Float(1.1));
        assert_eq!(opts.passthrough["half_size"], PassthroughValue::Bool(true));
        assert_eq!(opts.passthrough["bps"], PassthroughValue::Int(16));
        assert_eq!(opts.passthrough["camera"], PassthroughValue::Text("auto".into()));
    }

    #[test]
    fn failure_result_carries_kind_and_message() {
        let result = JobResult::failure("B", &JobError::decode("decode failed"), 3);
        assert_eq!(result.id(), "B");
        assert!(!result.is_success());
        assert_eq!(result.error_message(), Some("decode failed"));
        assert!(matches!(
            result,
            JobResult::Failure { error_kind: JobErrorKind::Decode, .. }
        ));
    }
}

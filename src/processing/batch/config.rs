use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};
use crate::core::{JobOptions, JpegPreset, OutputTarget, PassthroughValue, ResizeSettings};
use crate::utils::{BatchError, BatchResult, DEFAULT_INPUT_EXTENSIONS, OutputFormat};

/// Batch settings, loadable from a TOML file. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Jobs per chunk; at most this many run at once.
    pub concurrency: usize,
    /// When set, replaces `outputs` and `resize` with the preset's JPEG profile.
    pub jpeg_preset: Option<JpegPreset>,
    /// How long to wait for the progress reporter after the last chunk.
    pub progress_flush_timeout_ms: u64,
    /// Input extensions picked up when scanning a directory.
    pub extensions: Vec<String>,
    pub outputs: Vec<OutputTarget>,
    pub resize: ResizeSettings,
    pub passthrough: BTreeMap<String, PassthroughValue>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            jpeg_preset: None,
            progress_flush_timeout_ms: 2000,
            extensions: DEFAULT_INPUT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            outputs: vec![OutputTarget::Tiff, OutputTarget::from(OutputFormat::Thumbnail)],
            resize: ResizeSettings::default(),
            passthrough: BTreeMap::new(),
        }
    }
}

impl BatchConfig {
    /// Reads a config file. Extra keys are ignored.
    pub fn load(path: impl AsRef<Path>) -> BatchResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| BatchError::config_file(path, e))?;
        let cfg: BatchConfig = toml::from_str(&data).map_err(|e| BatchError::config_file(path, e))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn to_toml(&self) -> BatchResult<String> {
        toml::to_string_pretty(self).map_err(|e| BatchError::config_file("<default>", e))
    }

    /// Options applied to every job of the batch.
    pub fn job_options(&self) -> JobOptions {
        match self.jpeg_preset {
            Some(preset) => {
                let mut options = preset.options();
                options.passthrough = self.passthrough.clone();
                options
            }
            None => JobOptions {
                outputs: self.outputs.clone(),
                resize: self.resize.clone(),
                passthrough: self.passthrough.clone(),
            },
        }
    }

    pub fn progress_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.progress_flush_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResizeMode;

    #[test]
    fn default_config_values() {
        let cfg = BatchConfig::default();
        assert_eq!(cfg.concurrency, 3);
        assert_eq!(cfg.outputs.len(), 2);
        assert!(cfg.extensions.iter().any(|e| e == "jpg"));
        assert_eq!(cfg.progress_flush_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = BatchConfig::default();
        let toml = cfg.to_toml().unwrap();
        let parsed: BatchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        fs::write(
            &path,
            r#"
            concurrency = 8

            [resize]
            mode = "longest"
            size = 2048
            "#,
        )
        .unwrap();

        let cfg = BatchConfig::load(&path).unwrap();
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.resize.mode, ResizeMode::Longest);
        assert_eq!(cfg.outputs, BatchConfig::default().outputs);
    }

    #[test]
    fn preset_overrides_outputs() {
        let cfg = BatchConfig {
            jpeg_preset: Some(JpegPreset::Print),
            ..BatchConfig::default()
        };
        let options = cfg.job_options();
        assert_eq!(options.outputs, vec![OutputTarget::Jpeg { quality: 95 }]);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "concurrency = \"many\"").unwrap();

        let err = BatchConfig::load(&path).unwrap_err();
        assert!(matches!(err, BatchError::ConfigFile { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::utils::ConfigurationError;

/// Input extensions accepted by default when scanning a directory.
pub const DEFAULT_INPUT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif", "ppm", "pgm", "pnm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Tiff,
    Ppm,
    WebP,
    Thumbnail,
}

impl OutputFormat {
    /// Default JPEG quality used by the lossy targets
    pub fn default_quality(&self) -> u8 {
        match self {
            Self::Jpeg => 85,
            Self::Thumbnail => 80,
            _ => 100,
        }
    }

    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg | Self::Thumbnail => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Ppm => "ppm",
            Self::WebP => "webp",
        }
    }

    /// Short label used in results and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Ppm => "ppm",
            Self::WebP => "webp",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "tif" | "tiff" => Ok(Self::Tiff),
            "ppm" => Ok(Self::Ppm),
            "webp" => Ok(Self::WebP),
            "thumb" | "thumbnail" => Ok(Self::Thumbnail),
            other => Err(ConfigurationError::option(format!(
                "Unsupported output format: {}", other
            ))),
        }
    }
}

/// Returns true when `path` has one of `extensions` (case-insensitive).
pub fn has_extension(path: &std::path::Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

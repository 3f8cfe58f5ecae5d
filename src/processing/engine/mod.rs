//! Image processing engine on top of the `image` crate.
//!
//! - [`ImageProcessor`]: per-job handle that decodes, resizes and writes outputs.
//! - [`resize`]: maps `ResizeSettings` onto `image` resampling.
//! - [`formats`]: one encoder per `OutputTarget`.
//! - [`metadata`]: camera identification from EXIF.

mod executor;
mod formats;
mod metadata;
mod resize;

pub use executor::{ImageProcessor, image_executor};

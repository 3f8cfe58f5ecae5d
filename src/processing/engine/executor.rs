//! Image engine: decodes one input, applies the resize and writes every
//! requested output.
//!
//! All work is synchronous; the worker pool calls it from a blocking thread.

use std::fs;
use std::io::Cursor;
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::debug;
use crate::core::{JobDescriptor, JobOutput, OutputArtifact, OutputTarget, Resolution};
use crate::worker::{HandleExecutor, JobError, JobOutcome, ProcessorHandle};
use super::formats::encode_target;
use super::metadata::camera_tag;
use super::resize::{apply_resize, filter_from, fit_within};

/// One engine instance. Holds the input buffer between reads; [`close`]
/// releases it.
///
/// [`close`]: ProcessorHandle::close
#[derive(Debug, Default)]
pub struct ImageProcessor {
    input: Vec<u8>,
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(&self, locator: &str) -> JobOutcome<(DynamicImage, ImageFormat)> {
        let reader = ImageReader::new(Cursor::new(self.input.as_slice()))
            .with_guessed_format()
            .map_err(|e| JobError::decode(format!("Failed to inspect '{locator}': {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| JobError::decode(format!("Unrecognized image format: {locator}")))?;
        let image = reader
            .decode()
            .map_err(|e| JobError::decode(format!("Failed to decode '{locator}': {e}")))?;
        Ok((image, format))
    }
}

impl ProcessorHandle for ImageProcessor {
    fn run_job(&mut self, descriptor: &JobDescriptor) -> JobOutcome<JobOutput> {
        let locator = descriptor.input_locator.as_str();
        let options = &descriptor.options;

        self.input = fs::read(locator)
            .map_err(|e| JobError::open(format!("Cannot read input file '{locator}': {e}")))?;
        let input_size_bytes = self.input.len() as u64;

        let (image, format) = self.decode(locator)?;
        let resolution = Resolution { width: image.width(), height: image.height() };
        let source_tag = camera_tag(&self.input).unwrap_or_else(|| format!("{:?}", format).to_lowercase());
        debug!("Loaded '{}': {} ({})", locator, resolution, source_tag);

        let filter = filter_from(&options.passthrough)?;
        let image = apply_resize(image, &options.resize, filter)?;

        fs::create_dir_all(&descriptor.output_dir).map_err(|e| {
            JobError::Io(format!("Cannot create output directory: {e}"))
        })?;

        let mut outputs = Vec::with_capacity(options.outputs.len());
        for target in &options.outputs {
            let bytes = match target {
                OutputTarget::Thumbnail { max_edge, .. } => {
                    encode_target(&fit_within(&image, *max_edge, filter), target)?
                }
                _ => encode_target(&image, target)?,
            };

            let path = descriptor.output_path(target);
            fs::write(&path, &bytes)?;
            debug!("Wrote {} ({} bytes)", path.display(), bytes.len());

            outputs.push(OutputArtifact {
                label: target.label().to_string(),
                path,
                size_bytes: bytes.len() as u64,
            });
        }

        Ok(JobOutput {
            outputs,
            input_size_bytes,
            source_tag: Some(source_tag),
            resolution: Some(resolution),
        })
    }

    fn close(&mut self) {
        self.input = Vec::new();
    }
}

/// Executor that opens a fresh [`ImageProcessor`] per job.
pub fn image_executor() -> HandleExecutor<fn() -> JobOutcome<ImageProcessor>> {
    fn open() -> JobOutcome<ImageProcessor> {
        Ok(ImageProcessor::new())
    }
    HandleExecutor::new(open as fn() -> JobOutcome<ImageProcessor>)
}

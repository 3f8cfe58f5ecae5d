//! Job descriptor definition and creation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::{JobOptions, OutputTarget};

/// Describes one unit of conversion work.
///
/// Descriptors are built before scheduling and never mutated afterwards.
/// The `id` is used to correlate results; the core does not check it for
/// uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    /// Identifier used to correlate the result, usually the input path
    pub id: String,
    /// Path to the source image file
    pub input_locator: String,
    /// Directory the outputs are written into
    pub output_dir: PathBuf,
    /// Base name for output files; the input's file stem when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_stem: Option<String>,
    pub options: JobOptions,
}

impl JobDescriptor {
    pub fn new(
        id: impl Into<String>,
        input_locator: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        options: JobOptions,
    ) -> Self {
        Self {
            id: id.into(),
            input_locator: input_locator.into(),
            output_dir: output_dir.into(),
            output_stem: None,
            options,
        }
    }

    /// Creates a descriptor whose id is the input path.
    pub fn for_input(input: &Path, output_dir: &Path, options: JobOptions) -> Self {
        let locator = input.to_string_lossy().to_string();
        Self::new(locator.clone(), locator, output_dir, options)
    }

    pub fn with_output_stem(mut self, stem: impl Into<String>) -> Self {
        self.output_stem = Some(stem.into());
        self
    }

    /// Base name shared by every output of this job.
    pub fn output_stem(&self) -> String {
        if let Some(stem) = self.output_stem.as_deref().filter(|s| !s.trim().is_empty()) {
            return stem.to_string();
        }
        Path::new(&self.input_locator)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("output")
            .to_string()
    }

    /// `<output_dir>/<stem><suffix>.<ext>` for `target`.
    pub fn output_path(&self, target: &OutputTarget) -> PathBuf {
        self.output_dir.join(format!(
            "{}{}.{}",
            self.output_stem(),
            target.file_suffix(),
            target.format().extension()
        ))
    }

    /// Every file this job will write, in target order.
    pub fn output_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.options.outputs.iter().map(|target| self.output_path(target))
    }
}

/// Builds one descriptor per input, all sharing `output_dir` and `options`.
///
/// Inputs whose file stems collide (`a.png`, `a.bmp`) get the source
/// extension appended to their output stem (`a_png`, `a_bmp`).
pub fn build_descriptors(
    inputs: &[PathBuf],
    output_dir: &Path,
    options: &JobOptions,
) -> Vec<JobDescriptor> {
    let descriptors: Vec<JobDescriptor> = inputs
        .iter()
        .map(|input| JobDescriptor::for_input(input, output_dir, options.clone()))
        .collect();

    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for descriptor in &descriptors {
        *stem_counts.entry(descriptor.output_stem().to_lowercase()).or_default() += 1;
    }

    descriptors
        .into_iter()
        .map(|descriptor| {
            let stem = descriptor.output_stem();
            if stem_counts.get(&stem.to_lowercase()).copied().unwrap_or(0) < 2 {
                return descriptor;
            }
            let ext = Path::new(&descriptor.input_locator)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            if ext.is_empty() {
                descriptor
            } else {
                descriptor.with_output_stem(format!("{stem}_{ext}"))
            }
        })
        .collect()
}

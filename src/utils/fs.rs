use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use crate::utils::{BatchError, BatchResult, has_extension};

/// Lists files directly inside `dir` whose extension is in `extensions`,
/// sorted by path so descriptor order is stable between runs.
pub async fn discover_inputs(dir: impl AsRef<Path>, extensions: &[String]) -> BatchResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| BatchError::io(format!("Cannot read input directory {}: {}", dir.display(), e)))?;

    let mut inputs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if has_extension(&path, extensions) {
            inputs.push(path);
        }
    }
    inputs.sort();

    debug!("Discovered {} input files in {}", inputs.len(), dir.display());
    Ok(inputs)
}

/// Creates `dir` and its parents if missing
pub async fn ensure_dir(dir: impl AsRef<Path>) -> BatchResult<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .await
        .map_err(|e| BatchError::io(format!("Cannot create directory {}: {}", dir.display(), e)))
}

// src/utils/response_debug.rs
use std::fs;
use std::path::{Path, PathBuf};
use crate::utils::error::StorageError;

/// Writes a section's raw model response to `<dir>/<task_id>.txt`.
/// Used to inspect why a section failed schema validation.
pub fn save_raw_response(dir: &Path, task_id: &str, raw: &str) -> Result<PathBuf, StorageError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let path = dir.join(format!("{}.txt", task_id));
    fs::write(&path, raw)?;

    tracing::debug!("Saved raw response for {} to {}", task_id, path.display());
    Ok(path)
}

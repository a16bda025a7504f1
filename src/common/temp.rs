//! Scratch directories for extraction and staging.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Create `parent_dir/name` empty, removing whatever a previous run left there.
pub fn prepare_work_dir(parent_dir: &Path, name: &str) -> Result<PathBuf> {
    let work_dir = parent_dir.join(name);

    if work_dir.exists() {
        fs::remove_dir_all(&work_dir)
            .with_context(|| format!("Failed to remove stale {}", work_dir.display()))?;
    }
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    Ok(work_dir)
}

/// Remove a work directory. Missing directories are fine.
pub fn cleanup_work_dir(path: &Path) {
    let _ = fs::remove_dir_all(path);
}

//! Removal of generated directories.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;

/// Remove `dir` if present. Returns whether anything was removed.
fn remove_dir(dir: &Path, label: &str) -> Result<bool> {
    if !dir.exists() {
        println!("No {} to clean.", label);
        return Ok(false);
    }
    println!("Removing {}...", dir.display());
    fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    Ok(true)
}

/// Downloaded archives and extracted JDKs.
pub fn clean_downloads(config: &Config) -> Result<bool> {
    remove_dir(&config.downloads_dir(), "downloads")
}

/// Linked runtime images.
pub fn clean_builds(config: &Config) -> Result<bool> {
    remove_dir(&config.builds_dir(), "builds")
}

pub fn clean_releases(config: &Config) -> Result<bool> {
    remove_dir(&config.releases_dir(), "releases")
}

/// Generated module lists and reports. The manual override file is kept.
pub fn clean_analysis(config: &Config) -> Result<bool> {
    remove_dir(&config.analysis_dir(), "analysis output")
}

/// Everything jrekit generates.
pub fn clean_all(config: &Config) -> Result<bool> {
    let mut cleaned = false;
    cleaned |= clean_downloads(config)?;
    cleaned |= clean_builds(config)?;
    cleaned |= clean_releases(config)?;
    cleaned |= clean_analysis(config)?;
    Ok(cleaned)
}

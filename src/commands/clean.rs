//! Clean command - removes generated directories.

use anyhow::Result;

use crate::clean;
use crate::config::Config;

/// Clean target for the clean command.
pub enum CleanTarget {
    Downloads,
    Builds,
    Releases,
    Analysis,
    All,
}

/// Execute the clean command.
pub fn cmd_clean(config: &Config, target: CleanTarget) -> Result<()> {
    let cleaned = match target {
        CleanTarget::Downloads => clean::clean_downloads(config)?,
        CleanTarget::Builds => clean::clean_builds(config)?,
        CleanTarget::Releases => clean::clean_releases(config)?,
        CleanTarget::Analysis => clean::clean_analysis(config)?,
        CleanTarget::All => clean::clean_all(config)?,
    };
    if cleaned {
        println!("Clean complete.");
    }
    Ok(())
}

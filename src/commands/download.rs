//! Download command - fetches and extracts JDKs without linking.

use anyhow::Result;

use crate::cache::HostFs;
use crate::config::Config;
use crate::download::HttpSource;
use crate::pipeline::{run_batch, BatchSummary, Pipeline};
use crate::platform::Platform;
use crate::process::SystemRunner;

/// Execute the download command.
pub fn cmd_download(config: &Config, platform: Option<&str>) -> Result<BatchSummary> {
    let platforms = Platform::select(platform)?;
    let pipeline = Pipeline {
        config,
        source: &HttpSource,
        runner: &SystemRunner,
        probe: &HostFs,
    };

    let summary = run_batch("Download", &platforms, |p| {
        let root = pipeline.ensure_runtime(p)?;
        Ok(format!("JDK at {}", root.display()))
    });
    summary.print();
    Ok(summary)
}

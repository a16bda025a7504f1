//! Package command - packages runtimes that are already linked.

use anyhow::Result;

use crate::analyzer;
use crate::cache::HostFs;
use crate::config::Config;
use crate::download::HttpSource;
use crate::pipeline::{run_batch, BatchSummary, Pipeline};
use crate::platform::Platform;
use crate::process::SystemRunner;

/// Execute the package command.
pub fn cmd_package(config: &Config, platform: Option<&str>) -> Result<BatchSummary> {
    let platforms = Platform::select(platform)?;
    let artifacts = analyzer::discover_artifacts(&config.jars_dir)?;
    let pipeline = Pipeline {
        config,
        source: &HttpSource,
        runner: &SystemRunner,
        probe: &HostFs,
    };

    let summary = run_batch("Package", &platforms, |p| {
        let archive = pipeline.package_platform(p, &artifacts)?;
        Ok(format!("packaged {}", archive.display()))
    });
    summary.print();
    Ok(summary)
}

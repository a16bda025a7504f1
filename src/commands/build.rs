//! Build command - downloads, links and packages runtimes per platform.

use anyhow::Result;

use crate::analyzer;
use crate::cache::HostFs;
use crate::commands::analyze::run_analysis;
use crate::config::Config;
use crate::download::HttpSource;
use crate::pipeline::{run_batch, BatchSummary, Pipeline};
use crate::platform::Platform;
use crate::process::SystemRunner;
use crate::resolve::{resolve_modules, ModuleInputs};

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Platform name, `all`, or `None` for all.
    pub platform: Option<String>,
    /// Run JAR analysis before linking.
    pub analyze: bool,
    /// Package each platform after linking.
    pub package: bool,
}

/// Execute the build command.
pub fn cmd_build(config: &Config, options: &BuildOptions) -> Result<BatchSummary> {
    let pipeline = Pipeline {
        config,
        source: &HttpSource,
        runner: &SystemRunner,
        probe: &HostFs,
    };
    let summary = run_build(&pipeline, options)?;
    summary.print();
    Ok(summary)
}

/// The build itself, over whatever the pipeline is wired to.
///
/// Input errors (unknown platform, nothing to analyze) fail the whole run.
/// Everything after module resolution fails per platform.
pub fn run_build(pipeline: &Pipeline<'_>, options: &BuildOptions) -> Result<BatchSummary> {
    let config = pipeline.config;
    let platforms = Platform::select(options.platform.as_deref())?;

    if options.analyze {
        let (report, list_path) = run_analysis(config, pipeline.runner, pipeline.probe, &[])?;
        report.print();
        println!("\nWrote {}\n", list_path.display());
    }

    let analysis_dir = config.analysis_dir();
    let inputs = ModuleInputs::from_config(config, &analysis_dir);
    let resolved = resolve_modules(pipeline.probe, &inputs);
    println!("Modules ({}): {}\n", resolved.source, resolved.modules);

    let artifacts = if options.package {
        analyzer::discover_artifacts(&config.jars_dir)?
    } else {
        Vec::new()
    };

    Ok(run_batch("Build", &platforms, |platform| {
        pipeline.build_platform(platform, &resolved, &artifacts, options.package)
    }))
}

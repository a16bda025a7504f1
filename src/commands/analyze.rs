//! Analyze command - derives the module set from application JARs.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::analyzer::{self, AnalysisReport, Analyzer};
use crate::cache::{FsProbe, HostFs};
use crate::config::Config;
use crate::process::{self, SystemRunner, ToolRunner};

/// Execute the analyze command.
pub fn cmd_analyze(config: &Config, jars: &[PathBuf]) -> Result<()> {
    let (report, list_path) = run_analysis(config, &SystemRunner, &HostFs, jars)?;
    report.print();
    println!("\nWrote {}", list_path.display());
    Ok(())
}

/// Analyze `jars` (or everything in `JARS_DIR`) and persist the result.
///
/// Returns the report and the path of the written module list.
pub fn run_analysis(
    config: &Config,
    runner: &dyn ToolRunner,
    probe: &dyn FsProbe,
    jars: &[PathBuf],
) -> Result<(AnalysisReport, PathBuf)> {
    let artifacts = analyzer::collect_artifacts(jars, &config.jars_dir)?;
    let jdeps = find_jdeps(probe, &config.tools_dir, config.java_version);

    let report = Analyzer::new(runner, jdeps, config.java_version).analyze(&artifacts);
    let list_path = analyzer::persist(&report, &artifacts, &config.analysis_dir())?;
    Ok((report, list_path))
}

fn find_jdeps(probe: &dyn FsProbe, tools_dir: &Path, java_version: u32) -> Option<PathBuf> {
    analyzer::locate_jdeps(probe, tools_dir, java_version).or_else(|| process::which("jdeps"))
}

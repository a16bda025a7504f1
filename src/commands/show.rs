//! Show command - displays information.

use anyhow::Result;

use crate::analyzer;
use crate::cache::{self, HostFs};
use crate::config::Config;
use crate::platform::ALL_PLATFORMS;
use crate::resolve::{resolve_modules, ModuleInputs, ModuleSource};

/// Show target for the show command.
pub enum ShowTarget {
    /// Effective configuration
    Config,
    /// Supported platforms and what is on disk for each
    Platforms,
    /// The module set a build would use
    Modules,
}

/// Execute the show command.
pub fn cmd_show(config: &Config, target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
        ShowTarget::Platforms => show_platforms(config),
        ShowTarget::Modules => show_modules(config)?,
    }
    Ok(())
}

fn show_platforms(config: &Config) {
    println!("Platforms (JDK {}):\n", config.java_version);
    for platform in ALL_PLATFORMS {
        let jdk = if cache::runtime_root_is_ready(&HostFs, &config.runtime_root(platform)) {
            "extracted"
        } else if cache::archive_is_cached(&HostFs, &config.archive_path(platform)) {
            "downloaded"
        } else {
            "-"
        };
        let image = if cache::image_is_valid(&HostFs, &config.image_dir(platform), platform) {
            "linked"
        } else {
            "-"
        };
        println!(
            "  {:<16} {:<7} jdk: {:<10} image: {}",
            platform.name(),
            platform.archive_format().extension(),
            jdk,
            image
        );
        println!("    {}", platform.jdk_url(config.java_version));
    }
}

fn show_modules(config: &Config) -> Result<()> {
    let analysis_dir = config.analysis_dir();
    let resolved = resolve_modules(&HostFs, &ModuleInputs::from_config(config, &analysis_dir));

    println!("Source:  {}", resolved.source);
    println!("Count:   {}", resolved.modules.len());
    println!("Size:    ~{} MB (estimated)", resolved.modules.estimated_size_mb());
    println!("Modules: {}", resolved.modules);

    if let ModuleSource::Generated(list_path) = &resolved.source {
        let report_path = analyzer::report_path_for(list_path);
        if report_path.is_file() {
            println!();
            analyzer::load_report(&report_path)?.print();
        }
    }
    Ok(())
}

//! jrekit - builds minimal Java runtimes for each target platform.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jrekit::commands;
use jrekit::commands::build::BuildOptions;
use jrekit::config::Config;

#[derive(Parser)]
#[command(name = "jrekit")]
#[command(about = "Build minimal Java runtimes with jdeps and jlink")]
#[command(
    after_help = "QUICK START:\n  \
        jrekit analyze          Work out which modules jars/*.jar need\n  \
        jrekit build            Download, link and package every platform\n  \
        jrekit build linux-x64  Just one platform\n  \
        jrekit show modules     Which module set a build would use"
)]
struct Cli {
    /// Working directory holding jars/, downloads/, builds/ and releases/
    #[arg(long, global = true, default_value = ".")]
    workdir: PathBuf,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, link and package runtimes
    Build {
        /// Platform name, or "all" (default)
        platform: Option<String>,

        /// Analyze JARs before linking
        #[arg(long)]
        analyze: bool,

        /// Link only; skip packaging
        #[arg(long)]
        no_package: bool,
    },

    /// Derive the module set from application JARs
    Analyze {
        /// JAR files (default: every JAR in JARS_DIR)
        jars: Vec<PathBuf>,
    },

    /// Download and extract JDKs only
    Download {
        /// Platform name, or "all" (default)
        platform: Option<String>,
    },

    /// Package runtimes that are already linked
    Package {
        /// Platform name, or "all" (default)
        platform: Option<String>,
    },

    /// Show information
    Show {
        #[arg(value_enum)]
        what: ShowTarget,
    },

    /// Remove generated directories
    Clean {
        #[arg(value_enum, default_value = "all")]
        what: CleanTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowTarget {
    /// Effective configuration
    Config,
    /// Supported platforms and their state on disk
    Platforms,
    /// Module set a build would use, and where it comes from
    Modules,
}

#[derive(Clone, Copy, ValueEnum)]
enum CleanTarget {
    /// Downloaded archives and extracted JDKs
    Downloads,
    /// Linked runtime images
    Builds,
    /// Release directories and archives
    Releases,
    /// Generated module lists and reports
    Analysis,
    /// Everything above
    All,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.workdir)?;

    let summary = match cli.command {
        Commands::Build {
            platform,
            analyze,
            no_package,
        } => {
            let options = BuildOptions {
                platform,
                analyze,
                package: !no_package,
            };
            Some(commands::cmd_build(&config, &options)?)
        }

        Commands::Analyze { jars } => {
            commands::cmd_analyze(&config, &jars)?;
            None
        }

        Commands::Download { platform } => {
            Some(commands::cmd_download(&config, platform.as_deref())?)
        }

        Commands::Package { platform } => {
            Some(commands::cmd_package(&config, platform.as_deref())?)
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Platforms => commands::show::ShowTarget::Platforms,
                ShowTarget::Modules => commands::show::ShowTarget::Modules,
            };
            commands::cmd_show(&config, show_target)?;
            None
        }

        Commands::Clean { what } => {
            let clean_target = match what {
                CleanTarget::Downloads => commands::clean::CleanTarget::Downloads,
                CleanTarget::Builds => commands::clean::CleanTarget::Builds,
                CleanTarget::Releases => commands::clean::CleanTarget::Releases,
                CleanTarget::Analysis => commands::clean::CleanTarget::Analysis,
                CleanTarget::All => commands::clean::CleanTarget::All,
            };
            commands::cmd_clean(&config, clean_target)?;
            None
        }
    };

    if let Some(summary) = summary {
        if !summary.all_passed() {
            std::process::exit(1);
        }
    }
    Ok(())
}

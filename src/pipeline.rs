//! Per-platform batch processing.
//!
//! Platforms are processed one at a time in a fixed order. A failure is
//! recorded against its platform and the loop moves on; the caller decides
//! what a failed batch means for the exit code.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::analyzer::Artifact;
use crate::cache::{self, FsProbe};
use crate::config::Config;
use crate::download::{ArchiveSource, FetchOutcome};
use crate::extract;
use crate::linker::{self, LinkOutcome, Linker};
use crate::package::{self, PackageRequest};
use crate::platform::Platform;
use crate::process::ToolRunner;
use crate::resolve::ResolvedModules;
use crate::timing::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Ok,
    Fail,
}

/// Result of processing one platform.
#[derive(Debug, Clone)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub status: OutcomeStatus,
    pub details: String,
}

/// Results for every platform in a batch, in processing order.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub title: String,
    pub outcomes: Vec<PlatformOutcome>,
}

impl BatchSummary {
    pub fn all_passed(&self) -> bool {
        self.fail_count() == 0
    }

    pub fn fail_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Fail)
            .count()
    }

    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Fail)
            .map(|o| o.platform)
            .collect()
    }

    pub fn print(&self) {
        println!("\n=== {} Summary ===\n", self.title);
        for outcome in &self.outcomes {
            let status = match outcome.status {
                OutcomeStatus::Ok => "OK",
                OutcomeStatus::Fail => "FAIL",
            };
            // Only the first line of a multi-line error fits the table.
            let details = outcome.details.lines().next().unwrap_or("");
            println!("  [{:<4}] {:<16} {}", status, outcome.platform.name(), details);
        }

        let total = self.outcomes.len();
        println!("\n{}/{} platforms succeeded", total - self.fail_count(), total);
        if !self.all_passed() {
            println!("{} FAILED", self.fail_count());
        }
    }
}

/// Run `step` for each platform, collecting outcomes instead of stopping at
/// the first error.
pub fn run_batch<F>(title: &str, platforms: &[Platform], mut step: F) -> BatchSummary
where
    F: FnMut(Platform) -> Result<String>,
{
    let mut outcomes = Vec::with_capacity(platforms.len());
    for &platform in platforms {
        tracing::info!("=== {} ===", platform);
        let timer = Timer::start(format!("{} {}", title, platform));
        let outcome = match step(platform) {
            Ok(details) => PlatformOutcome {
                platform,
                status: OutcomeStatus::Ok,
                details,
            },
            Err(e) => {
                tracing::error!("{}: {:#}", platform, e);
                PlatformOutcome {
                    platform,
                    status: OutcomeStatus::Fail,
                    details: format!("{:#}", e),
                }
            }
        };
        timer.finish();
        outcomes.push(outcome);
    }
    BatchSummary {
        title: title.to_string(),
        outcomes,
    }
}

/// The stages for one platform, wired to their dependencies.
pub struct Pipeline<'a> {
    pub config: &'a Config,
    pub source: &'a dyn ArchiveSource,
    pub runner: &'a dyn ToolRunner,
    pub probe: &'a dyn FsProbe,
}

impl Pipeline<'_> {
    /// Download and extract the JDK for `platform` unless already extracted.
    pub fn ensure_runtime(&self, platform: Platform) -> Result<PathBuf> {
        let root = self.config.runtime_root(platform);
        if cache::runtime_root_is_ready(self.probe, &root) {
            tracing::info!("[SKIP] JDK for {} ready at {}", platform, root.display());
            return Ok(root);
        }

        let archive = self.config.archive_path(platform);
        let url = platform.jdk_url(self.config.java_version);
        match self
            .source
            .fetch(&url, &archive)
            .with_context(|| {
                format!(
                    "Failed to download JDK {} for {}",
                    self.config.java_version, platform
                )
            })?
        {
            FetchOutcome::Cached => {}
            FetchOutcome::Downloaded { bytes } => {
                tracing::info!("downloaded {} ({} bytes)", archive.display(), bytes)
            }
        }

        // The sidecar matches these bytes too; only removal forces a refetch.
        extract::prepare_runtime(&archive, platform, &root).map_err(|e| {
            tracing::warn!(
                "discarding {} so the next run downloads it again",
                archive.display()
            );
            cache::discard_archive(&archive);
            e
        })
    }

    /// Fetch, extract, link and (optionally) package one platform.
    pub fn build_platform(
        &self,
        platform: Platform,
        resolved: &ResolvedModules,
        artifacts: &[Artifact],
        package: bool,
    ) -> Result<String> {
        let root = self.ensure_runtime(platform)?;

        let Some(jlink) = linker::locate_jlink(self.probe, self.config) else {
            bail!(
                "jlink not found. Set JLINK, put a JDK under {}, or add jlink to PATH",
                self.config.tools_dir.display()
            );
        };
        let image = self.config.image_dir(platform);
        let linked = Linker::new(self.runner, self.probe, jlink, self.config.java_version)
            .link(platform, &root, resolved, &image)?;

        let mut details = match linked {
            LinkOutcome::Cached => "runtime image cached".to_string(),
            LinkOutcome::Linked => format!(
                "linked {} modules (~{} MB est.)",
                resolved.modules.len(),
                resolved.modules.estimated_size_mb()
            ),
        };

        if package {
            let archive = self.package_platform(platform, artifacts)?;
            details.push_str(&format!(", packaged {}", archive.display()));
        }
        Ok(details)
    }

    /// Package an already-linked runtime image.
    pub fn package_platform(&self, platform: Platform, artifacts: &[Artifact]) -> Result<PathBuf> {
        let image = self.config.image_dir(platform);
        let releases = self.config.releases_dir();
        let request = PackageRequest {
            platform,
            app_name: &self.config.app_name,
            image: &image,
            artifacts,
            releases_dir: &releases,
        };
        package::assemble(self.probe, &request)
    }
}

//! Runtime image linking with jlink.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::locate_versioned_tool;
use crate::cache::{self, FsProbe};
use crate::config::Config;
use crate::modules::ModuleSet;
use crate::platform::Platform;
use crate::process::{self, ToolRunner};
use crate::resolve::ResolvedModules;

/// First feature release whose jlink takes `zip-N` compression levels.
const ZIP_COMPRESS_SINCE: u32 = 21;

/// `--compress` value for the JDK doing the linking.
pub fn compress_level(java_version: u32) -> &'static str {
    if java_version >= ZIP_COMPRESS_SINCE {
        "zip-6"
    } else {
        "2"
    }
}

/// Full jlink argument list.
pub fn jlink_args(
    runtime_root: &Path,
    modules: &ModuleSet,
    dest: &Path,
    java_version: u32,
) -> Vec<String> {
    vec![
        "--module-path".to_string(),
        runtime_root.join("jmods").display().to_string(),
        "--add-modules".to_string(),
        modules.to_list_string(),
        "--output".to_string(),
        dest.display().to_string(),
        "--strip-debug".to_string(),
        format!("--compress={}", compress_level(java_version)),
        "--no-header-files".to_string(),
        "--no-man-pages".to_string(),
        "--strip-native-commands".to_string(),
    ]
}

/// Find jlink without consulting `PATH`.
///
/// Order: the `JLINK` override, the host platform's downloaded JDK, then
/// `<tools_dir>/<version>/bin/jlink` (and other versions, newest first).
pub fn locate_jlink_local(fs: &dyn FsProbe, config: &Config) -> Option<PathBuf> {
    if let Some(jlink) = &config.jlink {
        if fs.is_file(jlink) {
            return Some(jlink.clone());
        }
        tracing::warn!("JLINK={} does not exist; searching elsewhere", jlink.display());
    }

    let exe = process::host_exe_name("jlink");
    if let Some(host) = Platform::host() {
        let candidate = config.runtime_root(host).join("bin").join(&exe);
        if fs.is_file(&candidate) {
            return Some(candidate);
        }
    }

    locate_versioned_tool(fs, &config.tools_dir, config.java_version, "jlink")
}

/// Find jlink, falling back to `PATH`.
pub fn locate_jlink(fs: &dyn FsProbe, config: &Config) -> Option<PathBuf> {
    locate_jlink_local(fs, config).or_else(|| process::which("jlink"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A valid image was already present; jlink was not run.
    Cached,
    Linked,
}

/// Links runtime images for one JDK version.
pub struct Linker<'a> {
    runner: &'a dyn ToolRunner,
    fs: &'a dyn FsProbe,
    jlink: PathBuf,
    java_version: u32,
}

impl<'a> Linker<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        fs: &'a dyn FsProbe,
        jlink: PathBuf,
        java_version: u32,
    ) -> Self {
        Self {
            runner,
            fs,
            jlink,
            java_version,
        }
    }

    /// Link `resolved` from the JDK at `runtime_root` into `dest`.
    pub fn link(
        &self,
        platform: Platform,
        runtime_root: &Path,
        resolved: &ResolvedModules,
        dest: &Path,
    ) -> Result<LinkOutcome> {
        if cache::image_is_valid(self.fs, dest, platform) {
            tracing::info!("[SKIP] runtime image for {} already at {}", platform, dest.display());
            return Ok(LinkOutcome::Cached);
        }
        if dest.exists() {
            tracing::warn!("removing incomplete runtime image {}", dest.display());
            fs::remove_dir_all(dest)
                .with_context(|| format!("Failed to remove {}", dest.display()))?;
        }
        if !cache::runtime_root_is_ready(self.fs, runtime_root) {
            bail!(
                "No jmods/java.base.jmod under {}; the {} JDK must be extracted first",
                runtime_root.display(),
                platform
            );
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        tracing::info!(
            "linking {} modules for {} (from {})",
            resolved.modules.len(),
            platform,
            resolved.source
        );
        let args = jlink_args(runtime_root, &resolved.modules, dest, self.java_version);
        let out = self
            .runner
            .run(&self.jlink, &args)
            .with_context(|| format!("Failed to start {}", self.jlink.display()))?;

        if !out.success() {
            bail!(
                "jlink failed for {} (exit {}):\n{}",
                platform,
                out.code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()),
                out.stderr_trimmed()
            );
        }

        if !cache::image_is_valid(self.fs, dest, platform) {
            bail!(
                "jlink reported success but {} is missing",
                dest.join(platform.java_binary()).display()
            );
        }
        Ok(LinkOutcome::Linked)
    }
}

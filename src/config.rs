//! Configuration for jrekit.
//!
//! Reads `<workdir>/.env` (via dotenvy) and the process environment once at
//! startup. Environment variables take precedence over the .env file. The
//! resulting [`Config`] is passed explicitly to every stage.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::platform::Platform;

/// Java feature release used when `JAVA_VERSION` is unset.
pub const DEFAULT_JAVA_VERSION: u32 = 17;

/// Default name of the hand-written module override file.
pub const DEFAULT_MODULES_FILE: &str = "modules.txt";

/// jrekit configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the cache layout (downloads/, builds/, releases/, analysis/).
    pub work_dir: PathBuf,
    /// Java feature release to download and link against.
    pub java_version: u32,
    /// Explicit module list (`JRE_MODULES`). Wins over everything else.
    pub explicit_modules: Option<String>,
    /// Manual override file (`JRE_MODULES_FILE`).
    pub modules_file: PathBuf,
    /// Directory with one JDK per version, used to find jdeps/jlink.
    pub tools_dir: PathBuf,
    /// Explicit jlink binary (`JLINK`).
    pub jlink: Option<PathBuf>,
    /// Where application JARs are discovered.
    pub jars_dir: PathBuf,
    /// Name used for release archives.
    pub app_name: String,
}

impl Config {
    /// Load configuration from `<work_dir>/.env` and the environment.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let env_path = work_dir.join(".env");
        if env_path.exists() {
            dotenvy::from_path(&env_path)
                .with_context(|| format!("Failed to parse {}", env_path.display()))?;
        }
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(work_dir, &vars)
    }

    /// Build configuration from an explicit variable map.
    pub fn from_vars(work_dir: &Path, vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let path_or = |key: &str, default: &str| {
            get(key)
                .map(|s| {
                    let path = PathBuf::from(s);
                    if path.is_absolute() {
                        path
                    } else {
                        work_dir.join(path)
                    }
                })
                .unwrap_or_else(|| work_dir.join(default))
        };

        let java_version = match get("JAVA_VERSION") {
            Some(v) => v.parse::<u32>().with_context(|| {
                format!("JAVA_VERSION must be a feature release number, got '{}'", v)
            })?,
            None => DEFAULT_JAVA_VERSION,
        };

        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            java_version,
            explicit_modules: get("JRE_MODULES"),
            modules_file: path_or("JRE_MODULES_FILE", DEFAULT_MODULES_FILE),
            tools_dir: path_or("JDK_TOOLS_DIR", "tools"),
            jlink: get("JLINK").map(PathBuf::from),
            jars_dir: path_or("JARS_DIR", "jars"),
            app_name: get("APP_NAME").unwrap_or_else(|| "app".to_string()),
        })
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.work_dir.join("downloads")
    }

    pub fn builds_dir(&self) -> PathBuf {
        self.work_dir.join("builds")
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.work_dir.join("releases")
    }

    /// Auto-generated module lists and analysis reports.
    pub fn analysis_dir(&self) -> PathBuf {
        self.work_dir.join("analysis")
    }

    /// Downloaded JDK archive for `platform`.
    pub fn archive_path(&self, platform: Platform) -> PathBuf {
        self.downloads_dir().join(format!(
            "jdk-{}-{}.{}",
            self.java_version,
            platform,
            platform.archive_format().extension()
        ))
    }

    /// Extracted JDK root for `platform`, the one holding `jmods/`.
    pub fn runtime_root(&self, platform: Platform) -> PathBuf {
        self.downloads_dir()
            .join(format!("jdk-{}-{}", self.java_version, platform))
    }

    /// Linked runtime image for `platform`.
    pub fn image_dir(&self, platform: Platform) -> PathBuf {
        self.builds_dir().join(platform.name()).join("jre")
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  WORKDIR:          {}", self.work_dir.display());
        println!("  JAVA_VERSION:     {}", self.java_version);
        println!(
            "  JRE_MODULES:      {}",
            self.explicit_modules.as_deref().unwrap_or("(unset)")
        );
        println!("  JRE_MODULES_FILE: {}", self.modules_file.display());
        println!("  JDK_TOOLS_DIR:    {}", self.tools_dir.display());
        println!(
            "  JLINK:            {}",
            self.jlink
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(auto)".to_string())
        );
        println!("  JARS_DIR:         {}", self.jars_dir.display());
        println!("  APP_NAME:         {}", self.app_name);
    }
}

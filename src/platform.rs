//! Supported platform targets.
//!
//! The six targets are static configuration: each knows where to download
//! its JDK, what archive format the download uses, and where the runtime
//! root lives inside the extracted tree.

use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Adoptium binary endpoint. Redirects to the actual GitHub release asset.
pub const ADOPTIUM_URL_TEMPLATE: &str =
    "https://api.adoptium.net/v3/binary/latest/{version}/ga/{os}/{arch}/jdk/hotspot/normal/eclipse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Aarch64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// One operating-system/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

/// Every supported target, in batch order.
pub const ALL_PLATFORMS: [Platform; 6] = [
    Platform::new(Os::Linux, Arch::X64),
    Platform::new(Os::Linux, Arch::Aarch64),
    Platform::new(Os::MacOs, Arch::X64),
    Platform::new(Os::MacOs, Arch::Aarch64),
    Platform::new(Os::Windows, Arch::X64),
    Platform::new(Os::Windows, Arch::Aarch64),
];

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Short name used on the command line and in directory names.
    pub fn name(&self) -> &'static str {
        match (self.os, self.arch) {
            (Os::Linux, Arch::X64) => "linux-x64",
            (Os::Linux, Arch::Aarch64) => "linux-aarch64",
            (Os::MacOs, Arch::X64) => "macos-x64",
            (Os::MacOs, Arch::Aarch64) => "macos-aarch64",
            (Os::Windows, Arch::X64) => "windows-x64",
            (Os::Windows, Arch::Aarch64) => "windows-aarch64",
        }
    }

    /// Look a platform up by its short name.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim().to_lowercase();
        if let Some(p) = ALL_PLATFORMS.iter().find(|p| p.name() == wanted) {
            return Ok(*p);
        }
        bail!(
            "Unknown platform '{}'.\n  Valid platforms: {}, or 'all'",
            name,
            ALL_PLATFORMS
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    /// Parse a positional selector: a platform name, `all`, or nothing.
    pub fn select(selector: Option<&str>) -> Result<Vec<Self>> {
        match selector {
            None => Ok(ALL_PLATFORMS.to_vec()),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(ALL_PLATFORMS.to_vec()),
            Some(s) => Ok(vec![Self::from_name(s)?]),
        }
    }

    /// The platform jrekit itself is running on, if supported.
    pub fn host() -> Option<Self> {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            _ => return None,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Aarch64,
            _ => return None,
        };
        Some(Self::new(os, arch))
    }

    fn api_os(&self) -> &'static str {
        match self.os {
            Os::Linux => "linux",
            Os::MacOs => "mac",
            Os::Windows => "windows",
        }
    }

    fn api_arch(&self) -> &'static str {
        match self.arch {
            Arch::X64 => "x64",
            Arch::Aarch64 => "aarch64",
        }
    }

    /// Download URL for the JDK of the given feature version.
    pub fn jdk_url(&self, java_version: u32) -> String {
        ADOPTIUM_URL_TEMPLATE
            .replace("{version}", &java_version.to_string())
            .replace("{os}", self.api_os())
            .replace("{arch}", self.api_arch())
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self.os {
            Os::Windows => ArchiveFormat::Zip,
            Os::Linux | Os::MacOs => ArchiveFormat::TarGz,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Where the runtime root sits below the top-level extracted directory.
    pub fn nested_home(&self) -> Option<&'static str> {
        match self.os {
            Os::MacOs => Some("Contents/Home"),
            Os::Linux | Os::Windows => None,
        }
    }

    /// Entry-point binary relative to a runtime root.
    pub fn java_binary(&self) -> PathBuf {
        if self.is_windows() {
            Path::new("bin").join("java.exe")
        } else {
            Path::new("bin").join("java")
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

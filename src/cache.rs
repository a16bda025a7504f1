//! Cache validity checks.
//!
//! The cache is the filesystem itself: an entry is valid when the right file
//! is present. Every presence check goes through [`FsProbe`] so the policy can
//! be tested against [`MemFs`] without touching disk.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::platform::Platform;

/// A downloaded archive smaller than this is treated as truncated or an
/// error page, and is fetched again.
pub const MIN_ARCHIVE_BYTES: u64 = 1024 * 1024;

/// Read-only view of the filesystem used by cache and resolution policy.
pub trait FsProbe {
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn file_len(&self, path: &Path) -> Option<u64>;
    fn modified(&self, path: &Path) -> Option<SystemTime>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Immediate children of a directory. Empty if it does not exist.
    fn list_dir(&self, path: &Path) -> Vec<PathBuf>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFs;

impl FsProbe for HostFs {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_len(&self, path: &Path) -> Option<u64> {
        fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len())
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(path) else {
            return Vec::new();
        };
        let mut out: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        out.sort();
        out
    }
}

/// In-memory filesystem for tests.
#[derive(Debug, Default, Clone)]
pub struct MemFs {
    files: BTreeMap<PathBuf, (String, u64, SystemTime)>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with content, an explicit size and a modification time.
    pub fn add_file(
        &mut self,
        path: impl Into<PathBuf>,
        content: &str,
        len: u64,
        modified: SystemTime,
    ) -> &mut Self {
        self.files
            .insert(path.into(), (content.to_string(), len, modified));
        self
    }

    /// Add a text file whose size is its content length.
    pub fn add_text(
        &mut self,
        path: impl Into<PathBuf>,
        content: &str,
        modified: SystemTime,
    ) -> &mut Self {
        let len = content.len() as u64;
        self.add_file(path, content, len, modified)
    }

    pub fn remove(&mut self, path: &Path) {
        self.files.remove(path);
    }
}

impl FsProbe for MemFs {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files.keys().any(|p| p != path && p.starts_with(path))
    }

    fn file_len(&self, path: &Path) -> Option<u64> {
        self.files.get(path).map(|(_, len, _)| *len)
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.files.get(path).map(|(_, _, t)| *t)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .map(|(c, _, _)| c.clone())
            .with_context(|| format!("No such file: {}", path.display()))
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        // Directories exist implicitly as ancestors of files.
        let children: std::collections::BTreeSet<PathBuf> = self
            .files
            .keys()
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter_map(|rel| rel.components().next())
            .map(|first| path.join(first))
            .collect();
        children.into_iter().collect()
    }
}

/// A downloaded archive can be reused if it is plausibly complete.
pub fn archive_is_cached(fs: &dyn FsProbe, archive: &Path) -> bool {
    fs.file_len(archive)
        .map(|len| len > MIN_ARCHIVE_BYTES)
        .unwrap_or(false)
}

/// An extracted JDK is ready to link from once its base module is present.
pub fn runtime_root_is_ready(fs: &dyn FsProbe, root: &Path) -> bool {
    fs.is_file(&root.join("jmods").join("java.base.jmod"))
}

/// A linked image is valid if its entry-point binary exists.
pub fn image_is_valid(fs: &dyn FsProbe, image: &Path, platform: Platform) -> bool {
    fs.is_file(&image.join(platform.java_binary()))
}

// =============================================================================
// Archive checksums
// =============================================================================

/// Path of the checksum sidecar written next to a downloaded archive.
pub fn sidecar_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// SHA-256 of a file, lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open {} for checksum", path.display()))?;
    let mut reader = std::io::BufReader::with_capacity(1024 * 1024, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];
    loop {
        let n = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Record the checksum of a freshly downloaded archive.
pub fn write_sidecar(archive: &Path) -> Result<String> {
    let hash = sha256_file(archive)?;
    let sidecar = sidecar_path(archive);
    fs::write(&sidecar, &hash)
        .with_context(|| format!("Failed to write {}", sidecar.display()))?;
    Ok(hash)
}

/// Drop a cached archive and its sidecar so the next run downloads again.
pub fn discard_archive(archive: &Path) {
    for path in [archive.to_path_buf(), sidecar_path(archive)] {
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Check a cached archive against its sidecar.
///
/// Returns `None` when there is no sidecar to compare with.
pub fn verify_sidecar(archive: &Path) -> Result<Option<bool>> {
    let sidecar = sidecar_path(archive);
    if !sidecar.is_file() {
        return Ok(None);
    }
    let expected = fs::read_to_string(&sidecar)
        .with_context(|| format!("Failed to read {}", sidecar.display()))?;
    let actual = sha256_file(archive)?;
    Ok(Some(expected.trim().eq_ignore_ascii_case(&actual)))
}

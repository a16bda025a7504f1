//! JDK archive extraction.
//!
//! Unpacks tar.gz (Linux/macOS) and zip (Windows) downloads, then finds the
//! runtime root inside the extracted tree and moves it into place.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

use crate::cache::{self, HostFs};
use crate::common::{cleanup_work_dir, prepare_work_dir};
use crate::platform::{ArchiveFormat, Platform};

/// Counts from one unpack.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnpackStats {
    pub written: usize,
    /// Entries the host could not represent (or that pointed outside the
    /// destination) and were left out.
    pub skipped: usize,
}

/// Unpack `archive` into `dest`.
pub fn unpack(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<UnpackStats> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory {}", dest.display()))?;
    let stats = match format {
        ArchiveFormat::TarGz => unpack_tar_gz(archive, dest),
        ArchiveFormat::Zip => unpack_zip(archive, dest),
    }
    .with_context(|| format!("Failed to extract {}", archive.display()))?;

    if stats.skipped > 0 {
        tracing::warn!(
            "skipped {} entries from {} that this host cannot represent",
            stats.skipped,
            archive.display()
        );
    }
    Ok(stats)
}

fn unpack_tar_gz(archive: &Path, dest: &Path) -> Result<UnpackStats> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);

    let mut stats = UnpackStats::default();
    for entry in tar.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        let is_link = kind.is_symlink() || kind.is_hard_link();
        let path = entry.path()?.into_owned();

        if is_link && !cfg!(unix) {
            tracing::debug!("skipping link {}", path.display());
            stats.skipped += 1;
            continue;
        }

        match entry.unpack_in(dest) {
            Ok(true) => stats.written += 1,
            Ok(false) => {
                tracing::debug!("skipping {} (outside destination)", path.display());
                stats.skipped += 1;
            }
            Err(e) if is_link => {
                tracing::debug!("skipping link {}: {}", path.display(), e);
                stats.skipped += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to unpack {}", path.display()));
            }
        }
    }
    Ok(stats)
}

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn unpack_zip(archive: &Path, dest: &Path) -> Result<UnpackStats> {
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;

    let mut stats = UnpackStats::default();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            stats.skipped += 1;
            continue;
        };
        let out = dest.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            stats.written += 1;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }

        let mode = entry.unix_mode();
        if mode.map(|m| m & S_IFMT == S_IFLNK).unwrap_or(false) {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            if !link_target_is_enclosed(&target) {
                tracing::debug!(
                    "skipping link {} -> {} (outside destination)",
                    rel.display(),
                    target
                );
                stats.skipped += 1;
            } else if make_symlink(&target, &out).is_ok() {
                stats.written += 1;
            } else {
                tracing::debug!("skipping link {}", rel.display());
                stats.skipped += 1;
            }
            continue;
        }

        let mut f =
            File::create(&out).with_context(|| format!("Failed to create {}", out.display()))?;
        io::copy(&mut entry, &mut f)
            .with_context(|| format!("Failed to write {}", out.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(m) = mode {
                fs::set_permissions(&out, fs::Permissions::from_mode(m & 0o7777))?;
            }
        }
        stats.written += 1;
    }
    Ok(stats)
}

/// Later entries are written through earlier links, so a link may only
/// point at a relative path that never climbs out of its directory.
fn link_target_is_enclosed(target: &str) -> bool {
    !target.is_empty()
        && Path::new(target)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(unix)]
fn make_symlink(target: &str, out: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, out)
}

#[cfg(not(unix))]
fn make_symlink(_target: &str, _out: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this host",
    ))
}

/// Find the JDK root in a freshly extracted tree.
///
/// Looks for a top-level `jdk*` directory; on macOS the root is its
/// `Contents/Home` subdirectory.
pub fn locate_runtime_root(extracted: &Path, platform: Platform) -> Result<PathBuf> {
    let mut found = Vec::new();
    let mut candidates = Vec::new();
    for entry in fs::read_dir(extracted)
        .with_context(|| format!("Failed to read {}", extracted.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && name.starts_with("jdk") {
            candidates.push(entry.path());
        }
        found.push(name);
    }
    candidates.sort();
    found.sort();

    for dir in candidates {
        let root = match platform.nested_home() {
            Some(sub) => dir.join(sub),
            None => dir,
        };
        if root.is_dir() {
            return Ok(root);
        }
    }

    let layout = platform
        .nested_home()
        .map(|sub| format!(" containing {}", sub))
        .unwrap_or_default();
    bail!(
        "No JDK root found in {} for {}.\n  Expected a top-level 'jdk*' directory{}.\n  Found: {}",
        extracted.display(),
        platform,
        layout,
        if found.is_empty() {
            "(nothing)".to_string()
        } else {
            found.join(", ")
        }
    );
}

/// Extract `archive` and install its runtime root at `runtime_root`.
///
/// Skipped when `runtime_root` already holds a usable JDK. The temporary
/// extraction directory is removed whether or not this succeeds.
pub fn prepare_runtime(archive: &Path, platform: Platform, runtime_root: &Path) -> Result<PathBuf> {
    if cache::runtime_root_is_ready(&HostFs, runtime_root) {
        tracing::info!("[SKIP] JDK already extracted at {}", runtime_root.display());
        return Ok(runtime_root.to_path_buf());
    }

    let parent = runtime_root
        .parent()
        .with_context(|| format!("{} has no parent directory", runtime_root.display()))?;
    let work = prepare_work_dir(parent, &format!(".extract-{}", platform))?;

    let result = unpack(archive, platform.archive_format(), &work)
        .and_then(|_| locate_runtime_root(&work, platform))
        .and_then(|root| install_root(&root, runtime_root));

    cleanup_work_dir(&work);
    result?;

    if !cache::runtime_root_is_ready(&HostFs, runtime_root) {
        bail!(
            "Extracted JDK at {} has no jmods/java.base.jmod; jlink needs the JDK's jmods",
            runtime_root.display()
        );
    }
    Ok(runtime_root.to_path_buf())
}

fn install_root(found: &Path, runtime_root: &Path) -> Result<()> {
    if runtime_root.exists() {
        fs::remove_dir_all(runtime_root)
            .with_context(|| format!("Failed to remove stale {}", runtime_root.display()))?;
    }
    fs::rename(found, runtime_root).with_context(|| {
        format!(
            "Failed to move {} to {}",
            found.display(),
            runtime_root.display()
        )
    })
}

//! Release packaging.
//!
//! Assembles `releases/<app>-<platform>/` from a linked runtime image and the
//! application JARs, then compresses it into the platform's archive format.

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::analyzer::Artifact;
use crate::cache::{self, FsProbe};
use crate::common::{copy_tree, prepare_work_dir, write_file_mode, write_file_with_dirs};
use crate::platform::{ArchiveFormat, Platform};

/// Everything needed to package one platform.
#[derive(Debug, Clone)]
pub struct PackageRequest<'a> {
    pub platform: Platform,
    pub app_name: &'a str,
    pub image: &'a Path,
    pub artifacts: &'a [Artifact],
    pub releases_dir: &'a Path,
}

impl PackageRequest<'_> {
    /// `<app>-<platform>`, used for the staging directory and the archive.
    pub fn release_name(&self) -> String {
        format!("{}-{}", self.app_name, self.platform)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.releases_dir.join(format!(
            "{}.{}",
            self.release_name(),
            self.platform.archive_format().extension()
        ))
    }
}

/// Everything that blocks packaging, reported together.
pub fn check_preconditions(probe: &dyn FsProbe, req: &PackageRequest<'_>) -> Vec<String> {
    let mut errors = Vec::new();
    if !probe.is_dir(req.image) {
        errors.push(format!("runtime image not found at {}", req.image.display()));
    } else if !cache::image_is_valid(probe, req.image, req.platform) {
        errors.push(format!(
            "runtime image at {} has no {}",
            req.image.display(),
            req.platform.java_binary().display()
        ));
    }
    if req.artifacts.is_empty() {
        errors.push("no application JARs to package".to_string());
    }
    errors
}

/// Build the release directory and archive. Returns the archive path.
pub fn assemble(probe: &dyn FsProbe, req: &PackageRequest<'_>) -> Result<PathBuf> {
    let errors = check_preconditions(probe, req);
    if !errors.is_empty() {
        bail!(
            "Cannot package {}:\n  - {}",
            req.platform,
            errors.join("\n  - ")
        );
    }

    fs::create_dir_all(req.releases_dir)
        .with_context(|| format!("Failed to create {}", req.releases_dir.display()))?;
    let name = req.release_name();
    let stage = prepare_work_dir(req.releases_dir, &name)?;

    let copied = copy_tree(req.image, &stage.join("runtime"))?;
    tracing::debug!("copied {} runtime files", copied);

    let app_dir = stage.join("app");
    fs::create_dir_all(&app_dir)?;
    for artifact in req.artifacts {
        fs::copy(&artifact.path, app_dir.join(&artifact.name))
            .with_context(|| format!("Failed to copy {}", artifact.path.display()))?;
    }

    // check_preconditions guarantees at least one artifact
    let main_jar = &req.artifacts[0].name;
    if req.platform.is_windows() {
        write_file_with_dirs(stage.join("run.bat"), windows_launcher(main_jar))?;
    } else {
        write_file_mode(stage.join("run.sh"), unix_launcher(main_jar), 0o755)?;
    }
    write_file_with_dirs(stage.join("README.txt"), readme(req, main_jar))?;

    let archive = req.archive_path();
    if archive.exists() {
        fs::remove_file(&archive)
            .with_context(|| format!("Failed to remove old {}", archive.display()))?;
    }
    let written = match req.platform.archive_format() {
        ArchiveFormat::TarGz => write_tar_gz(&stage, &name, &archive),
        ArchiveFormat::Zip => write_zip(&stage, &name, &archive),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&archive);
        return Err(e.context(format!("Failed to write {}", archive.display())));
    }

    tracing::info!("packaged {} -> {}", req.platform, archive.display());
    Ok(archive)
}

pub fn unix_launcher(jar: &str) -> String {
    format!(
        "#!/bin/sh\n\
         DIR=\"$(cd \"$(dirname \"$0\")\" && pwd)\"\n\
         exec \"$DIR/runtime/bin/java\" $JAVA_OPTS -jar \"$DIR/app/{}\" \"$@\"\n",
        jar
    )
}

pub fn windows_launcher(jar: &str) -> String {
    format!(
        "@echo off\r\n\
         set DIR=%~dp0\r\n\
         \"%DIR%runtime\\bin\\java.exe\" %JAVA_OPTS% -jar \"%DIR%app\\{}\" %*\r\n",
        jar
    )
}

fn readme(req: &PackageRequest<'_>, main_jar: &str) -> String {
    let launcher = if req.platform.is_windows() {
        "run.bat"
    } else {
        "./run.sh"
    };
    let jars: Vec<&str> = req.artifacts.iter().map(|a| a.name.as_str()).collect();
    format!(
        "{app} for {platform}\n\
         \n\
         This directory contains a self-contained Java runtime and the\n\
         application. No separate Java installation is required.\n\
         \n\
         Run:\n    {launcher}\n\
         \n\
         Extra JVM options can be passed through the JAVA_OPTS environment\n\
         variable.\n\
         \n\
         Layout:\n    runtime/   minimal Java runtime\n    app/       {jars}\n\
         \n\
         Main JAR: {main_jar}\n",
        app = req.app_name,
        platform = req.platform,
        launcher = launcher,
        jars = jars.join(", "),
        main_jar = main_jar,
    )
}

fn write_tar_gz(stage: &Path, name: &str, archive: &Path) -> Result<()> {
    let file = File::create(archive)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);
    builder.append_dir_all(name, stage)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

fn write_zip(stage: &Path, name: &str, archive: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(archive)?);
    let base = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(stage).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(stage)?;
        let entry_name = if rel.as_os_str().is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", name, rel.to_string_lossy().replace('\\', "/"))
        };

        if entry.file_type().is_dir() {
            zip.add_directory(entry_name, base)?;
            continue;
        }
        zip.start_file(entry_name, base.unix_permissions(file_mode(entry.path())?))?;
        let mut src = File::open(entry.path())?;
        io::copy(&mut src, &mut zip)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<u32> {
    Ok(0o644)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::HostFs;
    use crate::platform::{Arch, Os};
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        image: PathBuf,
        releases: PathBuf,
        artifacts: Vec<Artifact>,
    }

    impl Fixture {
        fn new(java: &str) -> Self {
            let tmp = TempDir::new().unwrap();
            let image = tmp.path().join("builds/jre");
            write_file_mode(image.join("bin").join(java), "java", 0o755).unwrap();
            write_file_with_dirs(image.join("lib/modules"), "mods").unwrap();
            let jar = tmp.path().join("jars/app.jar");
            write_file_with_dirs(&jar, "PK").unwrap();
            Self {
                releases: tmp.path().join("releases"),
                artifacts: vec![Artifact::from_path(&jar).unwrap()],
                image,
                _tmp: tmp,
            }
        }

        fn request(&self, platform: Platform) -> PackageRequest<'_> {
            PackageRequest {
                platform,
                app_name: "demo",
                image: &self.image,
                artifacts: &self.artifacts,
                releases_dir: &self.releases,
            }
        }
    }

    #[test]
    fn test_linux_release_layout() {
        let fx = Fixture::new("java");
        let req = fx.request(Platform::new(Os::Linux, Arch::X64));
        let archive = assemble(&HostFs, &req).unwrap();

        assert!(archive.ends_with("demo-linux-x64.tar.gz"));
        let stage = fx.releases.join("demo-linux-x64");
        assert!(stage.join("runtime/bin/java").is_file());
        assert!(stage.join("app/app.jar").is_file());
        assert!(stage.join("README.txt").is_file());
        let script = fs::read_to_string(stage.join("run.sh")).unwrap();
        assert!(script.contains("-jar \"$DIR/app/app.jar\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(stage.join("run.sh")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        let mut names = Vec::new();
        let mut tar = tar::Archive::new(GzDecoder::new(File::open(&archive).unwrap()));
        for entry in tar.entries().unwrap() {
            names.push(entry.unwrap().path().unwrap().display().to_string());
        }
        assert!(names.iter().any(|n| n == "demo-linux-x64/run.sh"));
        assert!(names.iter().any(|n| n == "demo-linux-x64/runtime/bin/java"));
    }

    #[test]
    fn test_windows_release_is_zip_with_batch_launcher() {
        let fx = Fixture::new("java.exe");
        let req = fx.request(Platform::new(Os::Windows, Arch::X64));
        let archive = assemble(&HostFs, &req).unwrap();

        assert!(archive.ends_with("demo-windows-x64.zip"));
        let stage = fx.releases.join("demo-windows-x64");
        assert!(stage.join("run.bat").is_file());
        assert!(!stage.join("run.sh").exists());

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut bat = String::new();
        zip.by_name("demo-windows-x64/run.bat")
            .unwrap()
            .read_to_string(&mut bat)
            .unwrap();
        assert!(bat.contains("runtime\\bin\\java.exe"));
        assert!(bat.contains("app\\app.jar"));
        assert!(zip.by_name("demo-windows-x64/runtime/bin/java.exe").is_ok());
    }

    #[test]
    fn test_preconditions_reported_together() {
        let tmp = TempDir::new().unwrap();
        let req = PackageRequest {
            platform: Platform::new(Os::MacOs, Arch::Aarch64),
            app_name: "demo",
            image: &tmp.path().join("missing"),
            artifacts: &[],
            releases_dir: &tmp.path().join("releases"),
        };
        let err = assemble(&HostFs, &req).unwrap_err().to_string();
        assert!(err.contains("runtime image not found"));
        assert!(err.contains("no application JARs"));
        assert!(!tmp.path().join("releases").exists());
    }

    #[test]
    fn test_image_without_entry_point_blocks() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("jre");
        fs::create_dir_all(image.join("lib")).unwrap();
        let req = PackageRequest {
            platform: Platform::new(Os::Linux, Arch::Aarch64),
            app_name: "demo",
            image: &image,
            artifacts: &[],
            releases_dir: tmp.path(),
        };
        let errors = check_preconditions(&HostFs, &req);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("bin/java"));
    }
}

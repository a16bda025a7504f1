//! Shared test utilities for jrekit tests.
//!
//! Nothing here touches the network or needs a JDK: [`FakeJdk`] stands in for
//! jdeps and jlink, [`FakeMirror`] serves tiny JDK archives from memory.

#![allow(dead_code)]

use anyhow::{bail, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use jrekit::cache::{self, HostFs};
use jrekit::config::Config;
use jrekit::download::{ArchiveSource, FetchOutcome};
use jrekit::platform::{ArchiveFormat, Platform, ALL_PLATFORMS};
use jrekit::process::{CommandResult, ToolRunner};

/// Test environment: a temporary work directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    pub work_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let work_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            work_dir,
        }
    }

    /// Config for this work dir with the given variables set.
    pub fn config(&self, vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(&self.work_dir, &vars).expect("Failed to build config")
    }

    /// Config with `JLINK` pointing at a placeholder binary.
    pub fn config_with_jlink(&self, vars: &[(&str, &str)]) -> Config {
        let jlink = self.work_dir.join("fake-jdk/bin/jlink");
        create_mock_binary(&jlink);
        let jlink = jlink.display().to_string();
        let mut all: Vec<(&str, &str)> = vars.to_vec();
        all.push(("JLINK", jlink.as_str()));
        self.config(&all)
    }

    /// Put a JAR in `jars/`.
    pub fn add_jar(&self, name: &str) -> PathBuf {
        let path = self.work_dir.join("jars").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"PK\x03\x04").unwrap();
        path
    }

    /// Place a placeholder jdeps where tool lookup will find it.
    pub fn install_jdeps(&self, version: u32) -> PathBuf {
        let path = self
            .work_dir
            .join("tools")
            .join(version.to_string())
            .join("bin")
            .join(jrekit::process::host_exe_name("jdeps"));
        create_mock_binary(&path);
        path
    }
}

/// Create a placeholder executable.
pub fn create_mock_binary(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir for binary");
    }
    fs::write(path, "#!/bin/sh\necho mock\n").expect("Failed to create mock binary");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .expect("Failed to set permissions");
    }
}

/// Pretends to be jdeps and jlink.
///
/// jdeps answers are keyed by JAR file name; a JAR without an entry fails
/// every strategy. jlink writes the entry-point binary into `--output`.
#[derive(Default)]
pub struct FakeJdk {
    pub jdeps: HashMap<String, CommandResult>,
    pub calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl FakeJdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jdeps(mut self, jar: &str, reply: CommandResult) -> Self {
        self.jdeps.insert(jar.to_string(), reply);
        self
    }

    pub fn calls_to(&self, tool: &str) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter(|(program, _)| program == tool)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

impl ToolRunner for FakeJdk {
    fn run(&self, program: &Path, args: &[String]) -> Result<CommandResult> {
        let name = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.borrow_mut().push((name.clone(), args.to_vec()));

        match name.as_str() {
            "jdeps" => {
                let jar = args.last().map(Path::new).and_then(|p| p.file_name());
                let jar = jar.map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                Ok(self
                    .jdeps
                    .get(&jar)
                    .cloned()
                    .unwrap_or_else(|| CommandResult::failed(1, "Error: invalid jar")))
            }
            "jlink" => {
                let pos = args.iter().position(|a| a == "--output").unwrap();
                let out = PathBuf::from(&args[pos + 1]);
                let java = if out.to_string_lossy().contains("windows") {
                    "java.exe"
                } else {
                    "java"
                };
                create_mock_binary(&out.join("bin").join(java));
                fs::write(out.join("release"), "JAVA_VERSION=\"17\"\n").unwrap();
                Ok(CommandResult::ok(""))
            }
            other => bail!("unexpected tool {}", other),
        }
    }
}

/// Serves a minimal JDK archive for every platform, except the ones told
/// to fail or to serve garbage.
///
/// Like the HTTP source, an archive already on disk that passes the cache
/// checks is reused without a fetch.
pub struct FakeMirror {
    java_version: u32,
    failing: Vec<Platform>,
    corrupt: Vec<Platform>,
    pub fetched: RefCell<Vec<Platform>>,
}

impl FakeMirror {
    pub fn new(java_version: u32) -> Self {
        Self {
            java_version,
            failing: Vec::new(),
            corrupt: Vec::new(),
            fetched: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(mut self, platform: Platform) -> Self {
        self.failing.push(platform);
        self
    }

    /// Serve bytes that are not a valid archive for `platform`.
    pub fn corrupt(mut self, platform: Platform) -> Self {
        self.corrupt.push(platform);
        self
    }

    fn platform_for(&self, url: &str) -> Option<Platform> {
        ALL_PLATFORMS
            .into_iter()
            .find(|p| p.jdk_url(self.java_version) == url)
    }
}

impl ArchiveSource for FakeMirror {
    fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        let Some(platform) = self.platform_for(url) else {
            bail!("404 Not Found: {}", url);
        };
        if cache::archive_is_cached(&HostFs, dest) && cache::verify_sidecar(dest)? != Some(false) {
            return Ok(FetchOutcome::Cached);
        }
        self.fetched.borrow_mut().push(platform);
        if self.failing.contains(&platform) {
            bail!("connection reset while downloading {}", url);
        }
        if self.corrupt.contains(&platform) {
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, b"<html>502 Bad Gateway</html>").unwrap();
        } else {
            write_jdk_archive(platform, dest);
        }
        cache::write_sidecar(dest)?;
        Ok(FetchOutcome::Downloaded {
            bytes: fs::metadata(dest).unwrap().len(),
        })
    }
}

/// Write a tiny JDK archive laid out the way Adoptium ships them.
pub fn write_jdk_archive(platform: Platform, dest: &Path) {
    fs::create_dir_all(dest.parent().unwrap()).unwrap();
    let home = match platform.nested_home() {
        Some(sub) => format!("jdk-17.0.9+9/{}", sub),
        None => "jdk-17.0.9+9".to_string(),
    };
    let files = [
        (format!("{}/jmods/java.base.jmod", home), "jmod"),
        (format!("{}/jmods/java.sql.jmod", home), "jmod"),
        (format!("{}/release", home), "JAVA_VERSION=\"17.0.9\""),
    ];

    match platform.archive_format() {
        ArchiveFormat::TarGz => {
            let out = File::create(dest).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(out, Compression::fast()));
            for (name, data) in &files {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, name, data.as_bytes()).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }
        ArchiveFormat::Zip => {
            let out = File::create(dest).unwrap();
            let mut zip = zip::ZipWriter::new(out);
            for (name, data) in &files {
                zip.start_file(name.as_str(), zip::write::FileOptions::default())
                    .unwrap();
                zip.write_all(data.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
    }
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

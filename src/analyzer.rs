//! JAR dependency analysis with jdeps.
//!
//! Each JAR is analyzed on its own; successful results are unioned into one
//! module set. A JAR that fails analysis is reported as failed and left out
//! of the union. If nothing succeeds (or jdeps can't be found at all) the
//! built-in default set is used instead.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::FsProbe;
use crate::modules::ModuleSet;
use crate::process::{self, ToolRunner};

/// File stem used when more than one JAR was analyzed.
pub const COMBINED_NAME: &str = "combined";

/// Extension of auto-generated module-list files.
pub const MODULES_EXT: &str = "modules";

/// An application JAR found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl Artifact {
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)
            .with_context(|| format!("Cannot read artifact {}", path.display()))?;
        if !meta.is_file() {
            bail!("Artifact is not a file: {}", path.display());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Artifact has no file name: {}", path.display()))?;
        Ok(Self {
            name,
            path: path.to_path_buf(),
            size: meta.len(),
        })
    }

    /// File name without the `.jar` extension.
    pub fn stem(&self) -> &str {
        let n = self.name.len();
        if n > 4
            && self.name.is_char_boundary(n - 4)
            && self.name[n - 4..].eq_ignore_ascii_case(".jar")
        {
            &self.name[..n - 4]
        } else {
            &self.name
        }
    }
}

/// All `*.jar` files directly inside `dir`, sorted by name.
pub fn discover_artifacts(dir: &Path) -> Result<Vec<Artifact>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut artifacts = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        let is_jar = entry
            .path()
            .extension()
            .map(|e| e.eq_ignore_ascii_case("jar"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_jar {
            artifacts.push(Artifact::from_path(entry.path())?);
        }
    }
    Ok(artifacts)
}

/// Turn explicit paths into artifacts, or scan `jars_dir` when none are given.
///
/// Having nothing to analyze is an input error.
pub fn collect_artifacts(paths: &[PathBuf], jars_dir: &Path) -> Result<Vec<Artifact>> {
    let artifacts = if paths.is_empty() {
        discover_artifacts(jars_dir)?
    } else {
        paths
            .iter()
            .map(|p| Artifact::from_path(p))
            .collect::<Result<Vec<_>>>()?
    };
    if artifacts.is_empty() {
        bail!(
            "No JAR files found in {}.\n\n\
             Usage:\n  jrekit analyze [JAR...]\n\n\
             Put application JARs in {} or pass them as arguments.",
            jars_dir.display(),
            jars_dir.display()
        );
    }
    Ok(artifacts)
}

/// One way of invoking jdeps. Strategies are tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub label: &'static str,
    pub args: Vec<String>,
}

/// Ordered jdeps invocations for one JAR: the multi-release aware form
/// first, then the plain form for JARs that reject `--multi-release`.
pub fn invocation_strategies(java_version: u32, jar: &Path) -> Vec<Invocation> {
    let jar = jar.to_string_lossy().into_owned();
    vec![
        Invocation {
            label: "versioned",
            args: vec![
                "--multi-release".to_string(),
                java_version.to_string(),
                "--ignore-missing-deps".to_string(),
                "--print-module-deps".to_string(),
                jar.clone(),
            ],
        },
        Invocation {
            label: "plain",
            args: vec![
                "--ignore-missing-deps".to_string(),
                "--print-module-deps".to_string(),
                jar,
            ],
        },
    ]
}

/// Find a jdeps binary.
///
/// Looks in `<tools_dir>/<java_version>/bin`, then every other version in
/// `tools_dir` from newest to oldest.
pub fn locate_jdeps(fs: &dyn FsProbe, tools_dir: &Path, java_version: u32) -> Option<PathBuf> {
    locate_versioned_tool(fs, tools_dir, java_version, "jdeps")
}

/// Shared lookup for per-version JDK tools under `tools_dir`.
pub fn locate_versioned_tool(
    fs: &dyn FsProbe,
    tools_dir: &Path,
    java_version: u32,
    tool: &str,
) -> Option<PathBuf> {
    let exe = process::host_exe_name(tool);
    let preferred = tools_dir
        .join(java_version.to_string())
        .join("bin")
        .join(&exe);
    if fs.is_file(&preferred) {
        return Some(preferred);
    }

    let mut versions: Vec<(u32, PathBuf)> = fs
        .list_dir(tools_dir)
        .into_iter()
        .filter_map(|dir| {
            let v = dir.file_name()?.to_str()?.parse::<u32>().ok()?;
            Some((v, dir))
        })
        .collect();
    versions.sort_by(|a, b| b.0.cmp(&a.0));

    versions
        .into_iter()
        .map(|(_, dir)| dir.join("bin").join(&exe))
        .find(|candidate| fs.is_file(candidate))
}

/// Outcome of analyzing one JAR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub artifact: String,
    pub modules: ModuleSet,
    pub success: bool,
    /// Which strategy succeeded, or why every strategy failed.
    pub detail: String,
}

/// Run-level analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub tool: Option<PathBuf>,
    pub results: Vec<AnalysisResult>,
    pub combined: ModuleSet,
    /// True when `combined` is the built-in default set.
    pub used_default: bool,
}

impl AnalysisReport {
    pub fn failed(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn print(&self) {
        println!("=== Module Analysis ===\n");
        match &self.tool {
            Some(tool) => println!("  jdeps: {}", tool.display()),
            None => println!("  jdeps: NOT FOUND"),
        }
        println!();
        for r in &self.results {
            if r.success {
                println!("  [OK]   {} ({} modules)", r.artifact, r.modules.len());
            } else {
                println!("  [FAIL] {}: {}", r.artifact, r.detail);
            }
        }
        println!();
        println!(
            "Summary: {}/{} JARs analyzed",
            self.succeeded_count(),
            self.results.len()
        );
        if self.used_default {
            println!("         using default module set");
        }
        println!("         {} unique modules", self.combined.len());
        println!(
            "         estimated runtime size: ~{} MB",
            self.combined.estimated_size_mb()
        );
        println!("\nModules: {}", self.combined);
    }
}

/// Runs jdeps over a set of JARs.
pub struct Analyzer<'a> {
    runner: &'a dyn ToolRunner,
    jdeps: Option<PathBuf>,
    java_version: u32,
}

impl<'a> Analyzer<'a> {
    pub fn new(runner: &'a dyn ToolRunner, jdeps: Option<PathBuf>, java_version: u32) -> Self {
        Self {
            runner,
            jdeps,
            java_version,
        }
    }

    /// Analyze a single JAR, trying each invocation strategy in turn.
    pub fn analyze_artifact(&self, jdeps: &Path, artifact: &Artifact) -> AnalysisResult {
        let mut failures = Vec::new();

        for inv in invocation_strategies(self.java_version, &artifact.path) {
            match self.runner.run(jdeps, &inv.args) {
                Ok(out) if out.success() => {
                    let modules = ModuleSet::parse(&out.stdout);
                    if modules.is_empty() {
                        failures.push(format!("{}: no modules in output", inv.label));
                        continue;
                    }
                    tracing::debug!(
                        artifact = %artifact.name,
                        strategy = inv.label,
                        modules = modules.len(),
                        "jdeps succeeded"
                    );
                    return AnalysisResult {
                        artifact: artifact.name.clone(),
                        modules,
                        success: true,
                        detail: inv.label.to_string(),
                    };
                }
                Ok(out) => {
                    // Non-zero exit is a failure even if stdout looks usable.
                    let reason = first_line(out.stderr_trimmed())
                        .unwrap_or("no output")
                        .to_string();
                    failures.push(format!(
                        "{}: exit {} ({})",
                        inv.label,
                        out.code.unwrap_or(-1),
                        reason
                    ));
                }
                Err(e) => failures.push(format!("{}: {:#}", inv.label, e)),
            }
        }

        tracing::warn!(artifact = %artifact.name, "jdeps analysis failed: {}", failures.join("; "));
        AnalysisResult {
            artifact: artifact.name.clone(),
            modules: ModuleSet::new(),
            success: false,
            detail: failures.join("; "),
        }
    }

    /// Analyze every JAR and combine the results.
    pub fn analyze(&self, artifacts: &[Artifact]) -> AnalysisReport {
        let Some(jdeps) = self.jdeps.as_deref() else {
            tracing::warn!("jdeps not found; falling back to the default module set");
            return AnalysisReport {
                tool: None,
                results: artifacts
                    .iter()
                    .map(|a| AnalysisResult {
                        artifact: a.name.clone(),
                        modules: ModuleSet::new(),
                        success: false,
                        detail: "jdeps not found".to_string(),
                    })
                    .collect(),
                combined: ModuleSet::defaults(),
                used_default: true,
            };
        };

        let results: Vec<AnalysisResult> = artifacts
            .iter()
            .map(|a| self.analyze_artifact(jdeps, a))
            .collect();

        let mut combined = ModuleSet::new();
        for r in results.iter().filter(|r| r.success) {
            combined.extend_from(&r.modules);
        }

        let used_default = combined.is_empty();
        if used_default {
            tracing::warn!("every JAR failed analysis; falling back to the default module set");
            combined = ModuleSet::defaults();
        }

        AnalysisReport {
            tool: Some(jdeps.to_path_buf()),
            results,
            combined,
            used_default,
        }
    }
}

fn first_line(s: &str) -> Option<&str> {
    s.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Report written next to a `.modules` file by [`persist`].
pub fn report_path_for(list_path: &Path) -> PathBuf {
    list_path.with_extension("report.json")
}

/// Load a report written by [`persist`].
pub fn load_report(path: &Path) -> Result<AnalysisReport> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Base name for persisted analysis output.
pub fn output_name(artifacts: &[Artifact]) -> &str {
    match artifacts {
        [single] => single.stem(),
        _ => COMBINED_NAME,
    }
}

/// Write `<name>.modules` and `<name>.report.json` into `analysis_dir`.
///
/// Returns the module-list path, which is what the linker stage reads back.
pub fn persist(
    report: &AnalysisReport,
    artifacts: &[Artifact],
    analysis_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(analysis_dir)
        .with_context(|| format!("Failed to create {}", analysis_dir.display()))?;

    let name = output_name(artifacts);
    let list_path = analysis_dir.join(format!("{}.{}", name, MODULES_EXT));
    fs::write(&list_path, report.combined.to_list_string())
        .with_context(|| format!("Failed to write {}", list_path.display()))?;

    let report_path = report_path_for(&list_path);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&report_path, json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    tracing::info!("module list written to {}", list_path.display());
    Ok(list_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemFs;
    use crate::process::CommandResult;
    use std::cell::RefCell;
    use std::time::SystemTime;

    /// Replays canned results and records every call.
    struct Scripted {
        replies: RefCell<Vec<Result<CommandResult>>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<CommandResult>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for Scripted {
        fn run(&self, _program: &Path, args: &[String]) -> Result<CommandResult> {
            self.calls.borrow_mut().push(args.to_vec());
            self.replies.borrow_mut().remove(0)
        }
    }

    fn jar(name: &str) -> Artifact {
        Artifact {
            name: name.to_string(),
            path: PathBuf::from("/jars").join(name),
            size: 1,
        }
    }

    #[test]
    fn test_strategies_versioned_then_plain() {
        let s = invocation_strategies(17, Path::new("/a/app.jar"));
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].label, "versioned");
        assert_eq!(&s[0].args[..2], &["--multi-release".to_string(), "17".to_string()]);
        assert_eq!(s[1].label, "plain");
        assert!(!s[1].args.contains(&"--multi-release".to_string()));
        assert_eq!(s[1].args.last().unwrap(), "/a/app.jar");
    }

    #[test]
    fn test_falls_back_to_plain_invocation() {
        let runner = Scripted::new(vec![
            Ok(CommandResult::failed(1, "Error: app.jar is not a multi-release jar file")),
            Ok(CommandResult::ok("java.base,java.logging\n")),
        ]);
        let analyzer = Analyzer::new(&runner, Some(PathBuf::from("jdeps")), 17);
        let r = analyzer.analyze_artifact(Path::new("jdeps"), &jar("app.jar"));

        assert!(r.success);
        assert_eq!(r.detail, "plain");
        assert_eq!(r.modules.to_list_string(), "java.base,java.logging");
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn test_first_success_stops() {
        let runner = Scripted::new(vec![Ok(CommandResult::ok("java.base"))]);
        let analyzer = Analyzer::new(&runner, Some(PathBuf::from("jdeps")), 21);
        let r = analyzer.analyze_artifact(Path::new("jdeps"), &jar("app.jar"));
        assert!(r.success);
        assert_eq!(r.detail, "versioned");
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn test_nonzero_exit_with_output_is_failure() {
        let mut ambiguous = CommandResult::ok("java.base");
        ambiguous.code = Some(2);
        let runner = Scripted::new(vec![Ok(ambiguous.clone()), Ok(ambiguous)]);
        let analyzer = Analyzer::new(&runner, Some(PathBuf::from("jdeps")), 17);
        let r = analyzer.analyze_artifact(Path::new("jdeps"), &jar("app.jar"));
        assert!(!r.success);
        assert!(r.modules.is_empty());
    }

    #[test]
    fn test_empty_output_is_failure() {
        let runner = Scripted::new(vec![
            Ok(CommandResult::ok("\n")),
            Ok(CommandResult::ok("Warning: nothing")),
        ]);
        let analyzer = Analyzer::new(&runner, Some(PathBuf::from("jdeps")), 17);
        let r = analyzer.analyze_artifact(Path::new("jdeps"), &jar("app.jar"));
        assert!(!r.success);
        assert!(r.detail.contains("no modules"));
    }

    #[test]
    fn test_spawn_error_is_failure() {
        let runner = Scripted::new(vec![
            Err(anyhow::anyhow!("Failed to execute 'jdeps'")),
            Err(anyhow::anyhow!("Failed to execute 'jdeps'")),
        ]);
        let analyzer = Analyzer::new(&runner, Some(PathBuf::from("jdeps")), 17);
        let r = analyzer.analyze_artifact(Path::new("jdeps"), &jar("app.jar"));
        assert!(!r.success);
        assert!(r.detail.contains("Failed to execute"));
    }

    #[test]
    fn test_no_tool_uses_defaults() {
        let runner = Scripted::new(vec![]);
        let analyzer = Analyzer::new(&runner, None, 17);
        let report = analyzer.analyze(&[jar("a.jar"), jar("b.jar")]);
        assert!(report.used_default);
        assert_eq!(report.combined, ModuleSet::defaults());
        assert_eq!(report.failed().count(), 2);
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(&[jar("shop-1.0.jar")]), "shop-1.0");
        assert_eq!(output_name(&[jar("a.jar"), jar("b.jar")]), COMBINED_NAME);
    }

    #[test]
    fn test_locate_prefers_configured_version() {
        let t = SystemTime::UNIX_EPOCH;
        let exe = process::host_exe_name("jdeps");
        let mut fs = MemFs::new();
        fs.add_text(PathBuf::from("/tools/11/bin").join(&exe), "", t);
        fs.add_text(PathBuf::from("/tools/17/bin").join(&exe), "", t);
        fs.add_text(PathBuf::from("/tools/21/bin").join(&exe), "", t);

        assert_eq!(
            locate_jdeps(&fs, Path::new("/tools"), 17),
            Some(PathBuf::from("/tools/17/bin").join(&exe))
        );
        // Unknown version: newest available wins.
        assert_eq!(
            locate_jdeps(&fs, Path::new("/tools"), 8),
            Some(PathBuf::from("/tools/21/bin").join(&exe))
        );
        assert_eq!(locate_jdeps(&MemFs::new(), Path::new("/tools"), 17), None);
    }

    #[test]
    fn test_discover_artifacts_sorted_jars_only() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("b.jar"), b"bb").unwrap();
        fs::write(dir.path().join("a.JAR"), b"a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("lib.jar")).unwrap();

        let found = discover_artifacts(dir.path()).unwrap();
        let names: Vec<_> = found.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.JAR", "b.jar"]);
        assert_eq!(found[1].size, 2);
    }

    #[test]
    fn test_collect_artifacts_empty_is_input_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = collect_artifacts(&[], dir.path()).unwrap_err().to_string();
        assert!(err.contains("No JAR files found"));
        assert!(err.contains("Usage"));
    }
}

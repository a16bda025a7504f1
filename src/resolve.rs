//! Module set source selection.
//!
//! Exactly one source supplies the module list for a run, in this order:
//! 1. `JRE_MODULES` (explicit override)
//! 2. the manual override file (`JRE_MODULES_FILE`)
//! 3. the newest `*.modules` file in `analysis/`
//! 4. the built-in default set
//!
//! The result is a plain value handed to the linker.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::analyzer::MODULES_EXT;
use crate::cache::FsProbe;
use crate::config::Config;
use crate::modules::ModuleSet;

/// Where the module list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Explicit,
    ManualFile(PathBuf),
    Generated(PathBuf),
    Default,
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Explicit => write!(f, "JRE_MODULES environment override"),
            ModuleSource::ManualFile(p) => write!(f, "manual override file {}", p.display()),
            ModuleSource::Generated(p) => write!(f, "analysis output {}", p.display()),
            ModuleSource::Default => write!(f, "built-in default module set"),
        }
    }
}

/// The module set chosen for this run, with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModules {
    pub modules: ModuleSet,
    pub source: ModuleSource,
}

/// Inputs to resolution, separated from [`Config`] so tests can build them.
#[derive(Debug, Clone)]
pub struct ModuleInputs<'a> {
    pub explicit: Option<&'a str>,
    pub manual_file: &'a Path,
    pub analysis_dir: &'a Path,
}

impl<'a> ModuleInputs<'a> {
    pub fn from_config(config: &'a Config, analysis_dir: &'a Path) -> Self {
        Self {
            explicit: config.explicit_modules.as_deref(),
            manual_file: &config.modules_file,
            analysis_dir,
        }
    }
}

/// Pick the module set for this run.
pub fn resolve_modules(fs: &dyn FsProbe, inputs: &ModuleInputs<'_>) -> ResolvedModules {
    let resolved = select(fs, inputs);
    tracing::info!(
        source = %resolved.source,
        modules = resolved.modules.len(),
        "module set selected"
    );
    resolved
}

fn select(fs: &dyn FsProbe, inputs: &ModuleInputs<'_>) -> ResolvedModules {
    if let Some(explicit) = inputs.explicit {
        let modules = ModuleSet::parse(explicit);
        if !modules.is_empty() {
            return ResolvedModules {
                modules,
                source: ModuleSource::Explicit,
            };
        }
        tracing::warn!("JRE_MODULES is set but contains no module names; ignoring it");
    }

    if let Some(modules) = read_list(fs, inputs.manual_file) {
        return ResolvedModules {
            modules,
            source: ModuleSource::ManualFile(inputs.manual_file.to_path_buf()),
        };
    }

    for candidate in generated_by_recency(fs, inputs.analysis_dir) {
        if let Some(modules) = read_list(fs, &candidate) {
            return ResolvedModules {
                modules,
                source: ModuleSource::Generated(candidate),
            };
        }
    }

    ResolvedModules {
        modules: ModuleSet::defaults(),
        source: ModuleSource::Default,
    }
}

/// Auto-generated module lists, newest first. Ties break on path so the
/// order is deterministic.
pub fn generated_by_recency(fs: &dyn FsProbe, analysis_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(SystemTime, PathBuf)> = fs
        .list_dir(analysis_dir)
        .into_iter()
        .filter(|p| p.extension().map(|e| e == MODULES_EXT).unwrap_or(false))
        .filter(|p| fs.is_file(p))
        .map(|p| (fs.modified(&p).unwrap_or(SystemTime::UNIX_EPOCH), p))
        .collect();
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    files.into_iter().map(|(_, p)| p).collect()
}

fn read_list(fs: &dyn FsProbe, path: &Path) -> Option<ModuleSet> {
    if !fs.is_file(path) {
        return None;
    }
    match fs.read_to_string(path) {
        Ok(text) => {
            let modules = ModuleSet::parse(&text);
            if modules.is_empty() {
                tracing::warn!("{} has no module names; skipping", path.display());
                None
            } else {
                Some(modules)
            }
        }
        Err(e) => {
            tracing::warn!("{:#}; skipping", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemFs;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn inputs<'a>(explicit: Option<&'a str>) -> ModuleInputs<'a> {
        ModuleInputs {
            explicit,
            manual_file: Path::new("/w/modules.txt"),
            analysis_dir: Path::new("/w/analysis"),
        }
    }

    #[test]
    fn test_precedence_chain() {
        let mut fs = MemFs::new();
        fs.add_text("/w/modules.txt", "java.base,java.sql", at(10));
        fs.add_text("/w/analysis/old.modules", "java.base,java.xml", at(20));
        fs.add_text("/w/analysis/new.modules", "java.base,java.naming", at(30));

        let r = resolve_modules(&fs, &inputs(Some("java.base,java.logging")));
        assert_eq!(r.source, ModuleSource::Explicit);
        assert_eq!(r.modules.to_list_string(), "java.base,java.logging");

        let r = resolve_modules(&fs, &inputs(None));
        assert_eq!(r.source, ModuleSource::ManualFile(PathBuf::from("/w/modules.txt")));
        assert_eq!(r.modules.to_list_string(), "java.base,java.sql");

        fs.remove(Path::new("/w/modules.txt"));
        let r = resolve_modules(&fs, &inputs(None));
        assert_eq!(
            r.source,
            ModuleSource::Generated(PathBuf::from("/w/analysis/new.modules"))
        );
        assert_eq!(r.modules.to_list_string(), "java.base,java.naming");

        fs.remove(Path::new("/w/analysis/new.modules"));
        fs.remove(Path::new("/w/analysis/old.modules"));
        let r = resolve_modules(&fs, &inputs(None));
        assert_eq!(r.source, ModuleSource::Default);
        assert_eq!(r.modules, ModuleSet::defaults());
    }

    #[test]
    fn test_newest_generated_file_wins_regardless_of_name() {
        let mut fs = MemFs::new();
        fs.add_text("/w/analysis/a.modules", "java.base,java.xml", at(50));
        fs.add_text("/w/analysis/combined.modules", "java.base", at(40));
        fs.add_text("/w/analysis/z.modules", "java.base,java.sql", at(45));

        let order = generated_by_recency(&fs, Path::new("/w/analysis"));
        assert_eq!(
            order,
            vec![
                PathBuf::from("/w/analysis/a.modules"),
                PathBuf::from("/w/analysis/z.modules"),
                PathBuf::from("/w/analysis/combined.modules"),
            ]
        );
    }

    #[test]
    fn test_reports_are_not_module_lists() {
        let mut fs = MemFs::new();
        fs.add_text("/w/analysis/app.report.json", "{}", at(99));
        fs.add_text("/w/analysis/app.modules", "java.base", at(1));
        let r = resolve_modules(&fs, &inputs(None));
        assert_eq!(r.source, ModuleSource::Generated(PathBuf::from("/w/analysis/app.modules")));
    }

    #[test]
    fn test_empty_sources_are_skipped() {
        let mut fs = MemFs::new();
        fs.add_text("/w/modules.txt", "  \n", at(10));
        fs.add_text("/w/analysis/app.modules", "java.base", at(1));

        let r = resolve_modules(&fs, &inputs(Some(" , ")));
        assert_eq!(r.source, ModuleSource::Generated(PathBuf::from("/w/analysis/app.modules")));
    }

    #[test]
    fn test_nothing_present_is_default() {
        let r = resolve_modules(&MemFs::new(), &inputs(None));
        assert_eq!(r.source, ModuleSource::Default);
    }
}

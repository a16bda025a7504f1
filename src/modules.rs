//! Module sets: the runtime modules an application needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Baseline used when analysis is unavailable or fails for every JAR.
pub const DEFAULT_MODULES: &[&str] = &[
    "java.base",
    "java.datatransfer",
    "java.desktop",
    "java.logging",
    "java.management",
    "java.naming",
    "java.net.http",
    "java.prefs",
    "java.scripting",
    "java.sql",
    "java.xml",
    "jdk.crypto.ec",
    "jdk.unsupported",
    "jdk.zipfs",
];

/// The one module that pulls in AWT/Swing and most of the image size.
pub const GUI_MODULE: &str = "java.desktop";

const BASE_IMAGE_MB: u32 = 35;
const GUI_EXTRA_MB: u32 = 20;
const PER_MODULE_MB: u32 = 2;
const CORE_MODULE_COUNT: usize = 4;

/// Deduplicated set of module names. Iterates (and serializes) sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleSet(BTreeSet<String>);

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defaults() -> Self {
        DEFAULT_MODULES.iter().copied().collect()
    }

    /// Parse analyzer output or a module-list file.
    ///
    /// Splits on commas and newlines and drops anything that isn't a
    /// dotted Java identifier (warnings, error text, paths).
    pub fn parse(text: &str) -> Self {
        text.split(|c: char| c == ',' || c == '\n' || c == '\r')
            .map(str::trim)
            .filter(|tok| is_module_name(tok))
            .collect()
    }

    pub fn extend_from(&mut self, other: &ModuleSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn contains(&self, module: &str) -> bool {
        self.0.contains(module)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Canonical persisted form: sorted, comma-joined, one line.
    pub fn to_list_string(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }

    /// Rough size of a linked image in MB.
    pub fn estimated_size_mb(&self) -> u32 {
        let mut size = BASE_IMAGE_MB;
        if self.contains(GUI_MODULE) {
            size += GUI_EXTRA_MB;
        }
        let extra = self.len().saturating_sub(CORE_MODULE_COUNT) as u32;
        size + extra * PER_MODULE_MB
    }
}

impl<S: Into<String>> FromIterator<S> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_list_string())
    }
}

/// `java.base`, `jdk.crypto.ec`, ... Rejects anything with spaces or
/// punctuation, and the literal words jdeps uses in its diagnostics.
fn is_module_name(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let lower = token.to_ascii_lowercase();
    if ["error", "warning", "exception", "not found"]
        .iter()
        .any(|w| lower.contains(w))
    {
        return false;
    }
    token.split('.').all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

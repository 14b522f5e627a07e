//! Ignore rules: exact paths, basenames, and suffixes to skip during
//! scanning, in addition to the reserved metadata directory (which the
//! scanner always skips regardless of these rules).

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    exact_paths: HashSet<String>,
    basenames: HashSet<String>,
    suffixes: Vec<String>,
}

impl IgnoreRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exact_path(mut self, path: impl Into<String>) -> Self {
        self.exact_paths.insert(path.into());
        self
    }

    pub fn with_basename(mut self, name: impl Into<String>) -> Self {
        self.basenames.insert(name.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    /// Whether `rel_path` (forward-slash, relative to scan root) or
    /// `basename` should be skipped.
    pub fn is_ignored(&self, rel_path: &str, basename: &str) -> bool {
        if self.exact_paths.contains(rel_path) {
            return true;
        }
        if self.basenames.contains(basename) {
            return true;
        }
        self.suffixes.iter().any(|suffix| rel_path.ends_with(suffix.as_str()))
    }
}

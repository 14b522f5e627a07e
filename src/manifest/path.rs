//! Repository-relative path type and validation
//!
//! `RepoPath` is the only way to construct a path that can be placed
//! into a `Manifest`. All of the validation rules described in the
//! specification's data model live here so no other module can
//! construct an unvalidated path.

use unicode_normalization::UnicodeNormalization;

use super::errors::ManifestError;
use crate::repo_layout::META_DIR_NAME;

/// Reserved device names, case-insensitively, on any supported host OS
/// (the Windows reserved set is the superset that also covers POSIX).
const RESERVED_BASENAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters illegal on any supported host filesystem.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

/// A validated, NFC-normalized, forward-slash repository-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoPath(String);

impl RepoPath {
    /// Validate and wrap a path string.
    ///
    /// Returns `ManifestError::InvalidPath` if the string is empty,
    /// traverses above the repository root, names or descends into the
    /// reserved metadata directory, or fails any of the per-component
    /// validation rules (reserved device names, control characters,
    /// trailing whitespace/period, illegal characters).
    pub fn new(raw: &str) -> Result<Self, ManifestError> {
        if raw.is_empty() {
            return Err(ManifestError::invalid_path(raw, "path is empty"));
        }

        let normalized = raw.replace('\\', "/");
        if normalized.is_empty() {
            return Err(ManifestError::invalid_path(raw, "path is empty"));
        }

        for component in normalized.split('/') {
            if component == ".." {
                return Err(ManifestError::invalid_path(
                    raw,
                    "path traverses above repository root",
                ));
            }
            if component.is_empty() || component == "." {
                continue;
            }
            validate_component(raw, component)?;
        }

        if normalized == META_DIR_NAME || normalized.starts_with(&format!("{}/", META_DIR_NAME)) {
            return Err(ManifestError::invalid_path(
                raw,
                "path names or descends into the reserved metadata directory",
            ));
        }

        Ok(RepoPath(normalized))
    }

    /// Whether `raw` would pass `RepoPath::new` unchanged, i.e. is
    /// already NFC-normalized and otherwise valid.
    pub fn is_valid(raw: &str) -> bool {
        match Self::new(raw) {
            Ok(p) => p.as_str() == raw,
            Err(_) => false,
        }
    }

    /// Whether `raw`'s components are already NFC form (ignoring any
    /// other validation failure).
    pub fn is_nfc(raw: &str) -> bool {
        raw.nfc().collect::<String>() == raw
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Construct a path without validation.
    ///
    /// The only legitimate caller is the scanner when
    /// `normalize=false`: per the scanner's contract, paths that fail
    /// validation are still included in the manifest, just flagged
    /// with a warning rather than repaired. Every other caller must go
    /// through `RepoPath::new`.
    pub(crate) fn new_unchecked(raw: impl Into<String>) -> Self {
        RepoPath(raw.into().replace('\\', "/"))
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_component(raw: &str, component: &str) -> Result<(), ManifestError> {
    if component.nfc().collect::<String>() != component {
        return Err(ManifestError::invalid_path(raw, "path is not NFC-normalized"));
    }

    if component.chars().any(|c| c.is_control()) {
        return Err(ManifestError::invalid_path(raw, "path contains control characters"));
    }

    if component.chars().any(|c| ILLEGAL_CHARS.contains(&c)) {
        return Err(ManifestError::invalid_path(
            raw,
            "path contains characters illegal on a supported host filesystem",
        ));
    }

    if component.ends_with(' ') || component.ends_with('.') {
        return Err(ManifestError::invalid_path(
            raw,
            "path component has trailing whitespace or period",
        ));
    }

    let bare = component.split('.').next().unwrap_or(component);
    if RESERVED_BASENAMES.contains(&bare.to_ascii_uppercase().as_str()) {
        return Err(ManifestError::invalid_path(
            raw,
            "path component is a reserved device name",
        ));
    }

    Ok(())
}

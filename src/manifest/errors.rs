//! Manifest model error type
//!
//! Mirrors the structured-code-plus-severity error style used
//! throughout this codebase (compare `backup::errors`,
//! `promotion::errors`).

use std::fmt;
use std::io;

/// Manifest error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestErrorCode {
    /// Deserialization found a schema mismatch or unknown required field.
    BadManifest,
    /// A path failed validation (reserved name, control chars, etc.)
    InvalidPath,
    /// I/O failure reading or writing a manifest file.
    Io,
}

impl ManifestErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestErrorCode::BadManifest => "DSG_MANIFEST_BAD",
            ManifestErrorCode::InvalidPath => "DSG_MANIFEST_INVALID_PATH",
            ManifestErrorCode::Io => "DSG_MANIFEST_IO",
        }
    }
}

impl fmt::Display for ManifestErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A manifest model error.
#[derive(Debug)]
pub struct ManifestError {
    code: ManifestErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ManifestError {
    fn new(code: ManifestErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Schema mismatch or unknown required field during deserialization.
    pub fn bad_manifest(message: impl Into<String>) -> Self {
        Self::new(ManifestErrorCode::BadManifest, message)
    }

    /// A path failed validation.
    pub fn invalid_path(path: &str, reason: &str) -> Self {
        Self::new(
            ManifestErrorCode::InvalidPath,
            format!("invalid path '{}': {}", path, reason),
        )
    }

    /// I/O failure with an underlying cause.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ManifestErrorCode::Io,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn code(&self) -> ManifestErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        ManifestError::bad_manifest(err.to_string())
    }
}

impl From<ManifestError> for crate::errors::DsgError {
    fn from(err: ManifestError) -> Self {
        let kind = match err.code {
            ManifestErrorCode::BadManifest => crate::errors::ErrorKind::ManifestCorrupt,
            ManifestErrorCode::InvalidPath => crate::errors::ErrorKind::ValidationBlocked,
            ManifestErrorCode::Io => crate::errors::ErrorKind::ScanFailure,
        };
        crate::errors::DsgError::new(kind, err.message.clone())
    }
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

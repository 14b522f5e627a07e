//! Scanner error type.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorCode {
    /// I/O error during a sensitive operation; aborts the scan.
    Io,
    /// Attempted traversal above the scan root.
    EscapesRoot,
}

impl ScanErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanErrorCode::Io => "DSG_SCAN_IO",
            ScanErrorCode::EscapesRoot => "DSG_SCAN_ESCAPES_ROOT",
        }
    }
}

impl fmt::Display for ScanErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct ScanError {
    code: ScanErrorCode,
    message: String,
    path: Option<PathBuf>,
    source: Option<io::Error>,
}

impl ScanError {
    pub fn io(path: PathBuf, source: io::Error) -> Self {
        Self {
            code: ScanErrorCode::Io,
            message: format!("I/O error scanning {}", path.display()),
            path: Some(path),
            source: Some(source),
        }
    }

    pub fn escapes_root(path: PathBuf) -> Self {
        Self {
            code: ScanErrorCode::EscapesRoot,
            message: format!("path escapes scan root: {}", path.display()),
            path: Some(path),
            source: None,
        }
    }

    pub fn code(&self) -> ScanErrorCode {
        self.code
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ScanError> for crate::errors::DsgError {
    fn from(err: ScanError) -> Self {
        crate::errors::DsgError::new(crate::errors::ErrorKind::ScanFailure, err.message.clone())
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// A non-fatal scan warning: recorded but does not abort the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanWarning {
    /// A file could not be opened (permission denied); it is omitted.
    PermissionDenied { path: String },
    /// A path failed validation and was left as-is (no normalization requested).
    InvalidPath { path: String, reason: String },
    /// A path was renamed during normalization.
    Renamed { from: String, to: String },
    /// Two paths collided after NFC normalization; neither was renamed.
    NormalizationCollision { path: String, colliding_with: String },
}

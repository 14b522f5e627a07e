//! Remote filesystem error type.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFsErrorCode {
    Io,
    ManifestCorrupt,
    BackendFailure,
}

impl RemoteFsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteFsErrorCode::Io => "DSG_REMOTE_FS_IO",
            RemoteFsErrorCode::ManifestCorrupt => "DSG_REMOTE_FS_MANIFEST_CORRUPT",
            RemoteFsErrorCode::BackendFailure => "DSG_REMOTE_FS_BACKEND_FAILURE",
        }
    }
}

impl fmt::Display for RemoteFsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct RemoteFsError {
    code: RemoteFsErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl RemoteFsError {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self { code: RemoteFsErrorCode::Io, message: message.into(), source: Some(source) }
    }

    pub fn manifest_corrupt(message: impl Into<String>) -> Self {
        Self { code: RemoteFsErrorCode::ManifestCorrupt, message: message.into(), source: None }
    }

    pub fn backend_failure(message: impl Into<String>) -> Self {
        Self { code: RemoteFsErrorCode::BackendFailure, message: message.into(), source: None }
    }

    pub fn code(&self) -> RemoteFsErrorCode {
        self.code
    }
}

impl fmt::Display for RemoteFsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteFsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for RemoteFsError {
    fn from(err: io::Error) -> Self {
        RemoteFsError::io("remote filesystem I/O failure", err)
    }
}

impl From<RemoteFsError> for crate::errors::DsgError {
    fn from(err: RemoteFsError) -> Self {
        let kind = match err.code {
            RemoteFsErrorCode::Io => crate::errors::ErrorKind::TransportError,
            RemoteFsErrorCode::ManifestCorrupt => crate::errors::ErrorKind::ManifestCorrupt,
            RemoteFsErrorCode::BackendFailure => crate::errors::ErrorKind::BackendError,
        };
        crate::errors::DsgError::new(kind, err.message.clone())
    }
}

pub type RemoteFsResult<T> = Result<T, RemoteFsError>;

//! Archive error type.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorCode {
    Io,
    Encode,
    Decode,
}

impl ArchiveErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveErrorCode::Io => "DSG_ARCHIVE_IO",
            ArchiveErrorCode::Encode => "DSG_ARCHIVE_ENCODE",
            ArchiveErrorCode::Decode => "DSG_ARCHIVE_DECODE",
        }
    }
}

impl fmt::Display for ArchiveErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct ArchiveError {
    code: ArchiveErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ArchiveError {
    pub fn encode(message: impl Into<String>) -> Self {
        Self { code: ArchiveErrorCode::Encode, message: message.into(), source: None }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self { code: ArchiveErrorCode::Decode, message: message.into(), source: None }
    }

    pub fn code(&self) -> ArchiveErrorCode {
        self.code
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        Self { code: ArchiveErrorCode::Io, message: "archive I/O failure".to_string(), source: Some(err) }
    }
}

impl From<ArchiveError> for crate::errors::DsgError {
    fn from(err: ArchiveError) -> Self {
        crate::errors::DsgError::new(crate::errors::ErrorKind::ManifestCorrupt, err.message)
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

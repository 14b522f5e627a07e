//! Client filesystem error type.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFsErrorCode {
    Io,
    MarkerCorrupt,
}

impl ClientFsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientFsErrorCode::Io => "DSG_CLIENT_FS_IO",
            ClientFsErrorCode::MarkerCorrupt => "DSG_CLIENT_FS_MARKER_CORRUPT",
        }
    }
}

impl fmt::Display for ClientFsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct ClientFsError {
    code: ClientFsErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ClientFsError {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ClientFsErrorCode::Io,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn marker_corrupt(message: impl Into<String>) -> Self {
        Self {
            code: ClientFsErrorCode::MarkerCorrupt,
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> ClientFsErrorCode {
        self.code
    }
}

impl fmt::Display for ClientFsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ClientFsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for ClientFsError {
    fn from(err: io::Error) -> Self {
        ClientFsError::io("client filesystem I/O failure", err)
    }
}

impl From<ClientFsError> for crate::errors::DsgError {
    fn from(err: ClientFsError) -> Self {
        let kind = match err.code {
            ClientFsErrorCode::Io => crate::errors::ErrorKind::ScanFailure,
            ClientFsErrorCode::MarkerCorrupt => crate::errors::ErrorKind::Internal,
        };
        crate::errors::DsgError::new(kind, err.message.clone())
    }
}

pub type ClientFsResult<T> = Result<T, ClientFsError>;

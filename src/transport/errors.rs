//! Transport error type.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    Io,
    SessionNotOpen,
    Unsupported,
}

impl TransportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorCode::Io => "DSG_TRANSPORT_IO",
            TransportErrorCode::SessionNotOpen => "DSG_TRANSPORT_SESSION_NOT_OPEN",
            TransportErrorCode::Unsupported => "DSG_TRANSPORT_UNSUPPORTED",
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct TransportError {
    code: TransportErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl TransportError {
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self { code: TransportErrorCode::Io, message: message.into(), source: Some(source) }
    }

    pub fn session_not_open(message: impl Into<String>) -> Self {
        Self { code: TransportErrorCode::SessionNotOpen, message: message.into(), source: None }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self { code: TransportErrorCode::Unsupported, message: message.into(), source: None }
    }

    pub fn code(&self) -> TransportErrorCode {
        self.code
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::io("transport I/O failure", err)
    }
}

impl From<TransportError> for crate::errors::DsgError {
    fn from(err: TransportError) -> Self {
        crate::errors::DsgError::new(crate::errors::ErrorKind::TransportError, err.message)
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

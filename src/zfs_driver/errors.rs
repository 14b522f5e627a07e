//! Backend driver error type.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// A state transition was attempted that the current state forbids.
    ForbiddenTransition,
    /// The underlying `zfs`-equivalent command failed.
    CommandFailed,
}

impl BackendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendErrorKind::ForbiddenTransition => "DSG_BACKEND_FORBIDDEN_TRANSITION",
            BackendErrorKind::CommandFailed => "DSG_BACKEND_COMMAND_FAILED",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn forbidden_transition(from: &str, to: &str) -> Self {
        Self {
            kind: BackendErrorKind::ForbiddenTransition,
            message: format!("cannot transition from {} to {}", from, to),
        }
    }

    pub fn command_failed(message: impl Into<String>) -> Self {
        Self { kind: BackendErrorKind::CommandFailed, message: message.into() }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for crate::errors::DsgError {
    fn from(err: BackendError) -> Self {
        crate::errors::DsgError::new(crate::errors::ErrorKind::BackendError, err.message)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

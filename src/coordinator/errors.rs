//! Transaction coordinator error type.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorErrorCode {
    /// Pre-commit comparison found the remote manifest changed since
    /// `begin()`.
    RemoteMovedUnderneath,
    /// The manifest about to become the new cache carries an
    /// `entries_hash` that doesn't match its own recomputation.
    EntriesHashMismatch,
    /// Remote committed but the client commit did not succeed within
    /// the bounded retry count; a `needs-recovery` marker was written.
    ClientCommitExhausted,
    /// A lower-layer component (client fs, remote fs, transport,
    /// backend driver) failed.
    Component,
}

impl CoordinatorErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorErrorCode::RemoteMovedUnderneath => "DSG_COORDINATOR_REMOTE_MOVED_UNDERNEATH",
            CoordinatorErrorCode::EntriesHashMismatch => "DSG_COORDINATOR_ENTRIES_HASH_MISMATCH",
            CoordinatorErrorCode::ClientCommitExhausted => "DSG_COORDINATOR_CLIENT_COMMIT_EXHAUSTED",
            CoordinatorErrorCode::Component => "DSG_COORDINATOR_COMPONENT_FAILURE",
        }
    }
}

impl fmt::Display for CoordinatorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct CoordinatorError {
    code: CoordinatorErrorCode,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CoordinatorError {
    pub fn remote_moved_underneath() -> Self {
        Self {
            code: CoordinatorErrorCode::RemoteMovedUnderneath,
            message: "remote manifest changed between begin() and pre-commit validation".into(),
            source: None,
        }
    }

    pub fn entries_hash_mismatch() -> Self {
        Self {
            code: CoordinatorErrorCode::EntriesHashMismatch,
            message: "new cache manifest's embedded entries_hash does not match its own content".into(),
            source: None,
        }
    }

    pub fn client_commit_exhausted(attempts: u32) -> Self {
        Self {
            code: CoordinatorErrorCode::ClientCommitExhausted,
            message: format!(
                "client commit did not succeed after {} attempt(s); remote already advanced, \
                 needs-recovery marker written",
                attempts
            ),
            source: None,
        }
    }

    pub fn component(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code: CoordinatorErrorCode::Component,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// An invariant the coordinator itself is responsible for
    /// upholding was violated, with no lower-layer cause to attach.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: CoordinatorErrorCode::Component,
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> CoordinatorErrorCode {
        self.code
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<CoordinatorError> for crate::errors::DsgError {
    fn from(err: CoordinatorError) -> Self {
        use crate::errors::ErrorKind;
        let kind = match err.code {
            CoordinatorErrorCode::RemoteMovedUnderneath => ErrorKind::RemoteMovedUnderneath,
            CoordinatorErrorCode::EntriesHashMismatch => ErrorKind::Internal,
            CoordinatorErrorCode::ClientCommitExhausted => ErrorKind::BackendError,
            CoordinatorErrorCode::Component => ErrorKind::Internal,
        };
        crate::errors::DsgError::new(kind, err.message)
    }
}

macro_rules! component_from {
    ($ty:ty, $label:literal) => {
        impl From<$ty> for CoordinatorError {
            fn from(err: $ty) -> Self {
                CoordinatorError::component($label, err)
            }
        }
    };
}

component_from!(crate::client_fs::ClientFsError, "client filesystem operation failed");
component_from!(crate::remote_fs::RemoteFsError, "remote filesystem operation failed");
component_from!(crate::transport::TransportError, "transport operation failed");
component_from!(crate::archive::ArchiveError, "archive operation failed");

impl From<std::io::Error> for CoordinatorError {
    fn from(err: std::io::Error) -> Self {
        CoordinatorError::component("coordinator-level I/O failure", err)
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

//! Unified error taxonomy
//!
//! Per ERRORS.md-equivalent design for dsg: every module below this
//! one (`manifest`, `scanner`, `client_fs`, `remote_fs`, `transport`,
//! `coordinator`, `zfs_driver`) defines its own hand-rolled error type
//! with a structured code and optional `io::Error` source. This module
//! is the taxonomy all of those collapse into at the `lifecycle`
//! boundary, so callers see one error shape with one exit-code
//! mapping.
//!
//! All errors are fatal to the current transaction. There are no
//! silent retries and no partial successes; a `DsgError` always
//! reports the transaction id (if one had been opened), the failing
//! path (if any), and a stable `kind` tag suitable for test
//! assertions.

use std::fmt;
use std::io;

/// The error taxonomy, by kind rather than by originating type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Repository spec missing or ill-typed. Transaction never started.
    ConfigInvalid,
    /// Working tree unreadable or catastrophically inconsistent.
    ScanFailure,
    /// Filename validation rejected paths and `normalize=false`.
    ValidationBlocked,
    /// A three-way disagreement exists in the plan.
    ConflictsBlockSync,
    /// Pre-commit remote-manifest comparison detected a concurrent writer.
    RemoteMovedUnderneath,
    /// Transport-level failure; recoverable only by re-running.
    TransportError,
    /// Snapshot/rename/promote failed at the backend driver.
    BackendError,
    /// Malformed on-disk manifest.
    ManifestCorrupt,
    /// Invariant violation; always a bug.
    Internal,
}

impl ErrorKind {
    /// Stable string tag, used in diagnostics and test assertions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "CONFIG_INVALID",
            ErrorKind::ScanFailure => "SCAN_FAILURE",
            ErrorKind::ValidationBlocked => "VALIDATION_BLOCKED",
            ErrorKind::ConflictsBlockSync => "CONFLICTS_BLOCK_SYNC",
            ErrorKind::RemoteMovedUnderneath => "REMOTE_MOVED_UNDERNEATH",
            ErrorKind::TransportError => "TRANSPORT_ERROR",
            ErrorKind::BackendError => "BACKEND_ERROR",
            ErrorKind::ManifestCorrupt => "MANIFEST_CORRUPT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// The exit code the out-of-scope CLI collaborator maps this kind
    /// to, per the external interfaces section of the specification.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::ConfigInvalid | ErrorKind::ValidationBlocked => 2,
            ErrorKind::ConflictsBlockSync => 3,
            ErrorKind::TransportError | ErrorKind::RemoteMovedUnderneath => 4,
            ErrorKind::BackendError | ErrorKind::ScanFailure | ErrorKind::ManifestCorrupt => 4,
            ErrorKind::Internal => 5,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fatal, fully-diagnosed sync engine error.
#[derive(Debug)]
pub struct DsgError {
    kind: ErrorKind,
    message: String,
    transaction_id: Option<String>,
    path: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DsgError {
    /// Create a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            transaction_id: None,
            path: None,
            source: None,
        }
    }

    /// Attach the transaction id this error occurred within.
    pub fn with_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Attach the path this error concerns, if any.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach an underlying error as the cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error kind tag.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The transaction id, if one had been opened.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    /// The failing path, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The exit code the CLI collaborator should use.
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Convenience constructor: conflicts block sync.
    pub fn conflicts_block_sync(conflict_count: usize) -> Self {
        Self::new(
            ErrorKind::ConflictsBlockSync,
            format!("{} path(s) have unresolved three-way conflicts", conflict_count),
        )
    }

    /// Convenience constructor: remote moved underneath the transaction.
    pub fn remote_moved_underneath() -> Self {
        Self::new(
            ErrorKind::RemoteMovedUnderneath,
            "remote manifest changed between begin and pre-commit validation",
        )
    }

    /// Convenience constructor: an invariant was violated.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for DsgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(ref tx) = self.transaction_id {
            write!(f, " (transaction={})", tx)?;
        }
        if let Some(ref path) = self.path {
            write!(f, " (path={})", path)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DsgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for DsgError {
    fn from(err: io::Error) -> Self {
        DsgError::new(ErrorKind::Internal, err.to_string()).with_source(err)
    }
}

/// Result type for top-level engine operations.
pub type DsgResult<T> = Result<T, DsgError>;

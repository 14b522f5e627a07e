//! Observable events emitted during sync engine operation.
//!
//! Events are explicit and typed so that every log line carries a
//! stable, greppable name instead of an ad-hoc format string.

use std::fmt;

/// Observable events covering the lifecycle of a repository and the
/// phases of a single sync transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `init` began turning a directory into a repository.
    RepoInitStart,
    /// `init` finished; `.dsg/` is in place.
    RepoInitComplete,
    /// `clone` began materializing a repository from a remote.
    RepoCloneStart,
    /// `clone` finished.
    RepoCloneComplete,

    /// Local tree / cache / remote scan began.
    ScanStart,
    /// Scan finished and produced a manifest.
    ScanComplete,
    /// A path was rewritten during NFC normalization.
    PathNormalized,

    /// Three-way reconciliation classified every path.
    ReconcileComplete,
    /// The sync plan was built from the classification.
    PlanBuilt,
    /// A path was left out of the plan because both sides diverged
    /// from the cache without agreement (a real conflict).
    ConflictDetected,

    /// Two-phase commit transaction opened.
    TransactionBegin,
    /// Archive files existing on only one side were exchanged.
    ArchiveExchangeComplete,
    /// Pre-commit validation (entries_hash recheck, remote-moved-underneath
    /// check) passed.
    PrecommitValidated,
    /// The remote side committed.
    RemoteCommitted,
    /// The client side committed.
    ClientCommitted,
    /// The client commit did not succeed within the retry budget; a
    /// needs-recovery marker was written.
    ClientCommitExhausted,
    /// The transaction was rolled back before either side committed.
    TransactionRolledBack,
    /// A single file was uploaded.
    FileUploaded,
    /// A single file was downloaded.
    FileDownloaded,
    /// A single file was deleted (either side).
    FileDeleted,

    /// A predecessor manifest was archived after a successful commit.
    PredecessorArchived,

    /// The repository lock was acquired.
    LockAcquired,
    /// The repository lock was released.
    LockReleased,
    /// Lock acquisition was refused because another process holds it.
    LockContended,

    /// A prior interrupted transaction was recovered on startup.
    RecoveryReplayed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RepoInitStart => "REPO_INIT_BEGIN",
            Event::RepoInitComplete => "REPO_INIT_COMPLETE",
            Event::RepoCloneStart => "REPO_CLONE_BEGIN",
            Event::RepoCloneComplete => "REPO_CLONE_COMPLETE",

            Event::ScanStart => "SCAN_BEGIN",
            Event::ScanComplete => "SCAN_COMPLETE",
            Event::PathNormalized => "PATH_NORMALIZED",

            Event::ReconcileComplete => "RECONCILE_COMPLETE",
            Event::PlanBuilt => "PLAN_BUILT",
            Event::ConflictDetected => "CONFLICT_DETECTED",

            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::ArchiveExchangeComplete => "ARCHIVE_EXCHANGE_COMPLETE",
            Event::PrecommitValidated => "PRECOMMIT_VALIDATED",
            Event::RemoteCommitted => "REMOTE_COMMITTED",
            Event::ClientCommitted => "CLIENT_COMMITTED",
            Event::ClientCommitExhausted => "CLIENT_COMMIT_EXHAUSTED",
            Event::TransactionRolledBack => "TRANSACTION_ROLLED_BACK",
            Event::FileUploaded => "FILE_UPLOADED",
            Event::FileDownloaded => "FILE_DOWNLOADED",
            Event::FileDeleted => "FILE_DELETED",

            Event::PredecessorArchived => "PREDECESSOR_ARCHIVED",

            Event::LockAcquired => "LOCK_ACQUIRED",
            Event::LockReleased => "LOCK_RELEASED",
            Event::LockContended => "LOCK_CONTENDED",

            Event::RecoveryReplayed => "RECOVERY_REPLAYED",
        }
    }

    /// Whether this event indicates a condition that leaves the
    /// repository in a state requiring operator attention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ClientCommitExhausted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! `SyncPlan`: the disjoint operation sets a classified merge compiles
//! down to, plus the metadata sync set.

use crate::manifest::RepoPath;

/// What kind of sync this is, inferred from the shape of the inputs.
/// Threaded through so `lifecycle` and `zfs_driver` don't have to
/// re-derive it from the manifests themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Remote manifest empty and the remote backend has no existing
    /// dataset: first-ever sync of this repository.
    Init,
    /// Local working tree empty: populating a fresh checkout from an
    /// existing remote.
    Clone,
    /// The common case: both sides already have history.
    Sync,
}

/// The compiled result of classifying every path, ready for the
/// transaction coordinator to apply.
///
/// All path sets are disjoint: a path appears in exactly one of
/// `uploads`, `downloads`, `delete_local`, `delete_remote`,
/// `cache_repair`, `cache_cleanup`, or `conflicts`.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub kind: Option<OperationKind>,
    pub uploads: Vec<RepoPath>,
    pub downloads: Vec<RepoPath>,
    pub delete_local: Vec<RepoPath>,
    pub delete_remote: Vec<RepoPath>,
    pub cache_repair: Vec<RepoPath>,
    pub cache_cleanup: Vec<RepoPath>,
    pub conflicts: Vec<RepoPath>,
    /// Archived snapshot ids present on exactly one side, to be
    /// exchanged bidirectionally as part of the same transaction.
    pub archive_exchange: Vec<String>,
}

impl SyncPlan {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// No path requires any action and no archives need exchanging.
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
            && self.downloads.is_empty()
            && self.delete_local.is_empty()
            && self.delete_remote.is_empty()
            && self.cache_repair.is_empty()
            && self.cache_cleanup.is_empty()
            && self.conflicts.is_empty()
            && self.archive_exchange.is_empty()
    }

    pub fn total_operations(&self) -> usize {
        self.uploads.len()
            + self.downloads.len()
            + self.delete_local.len()
            + self.delete_remote.len()
            + self.cache_repair.len()
            + self.cache_cleanup.len()
    }
}

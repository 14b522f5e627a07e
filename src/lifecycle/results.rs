//! Result types returned by the five engine entry points.

use std::collections::BTreeMap;

use crate::manifest::{Entry, ManifestMetadata, RepoPath};
use crate::merger::SyncState;
use crate::planner::SyncPlan;
use crate::scanner::ScanWarning;

/// `init(...)`: always produces `s1` (a fresh repository has no
/// predecessor).
#[derive(Debug, Clone)]
pub struct InitResult {
    pub transaction_id: String,
    pub snapshot_id: String,
    pub entry_count: usize,
}

/// `clone(...)`: materializes the working tree from an existing
/// remote; the snapshot id is whatever the remote's head already was.
#[derive(Debug, Clone)]
pub struct CloneResult {
    pub transaction_id: String,
    pub snapshot_id: String,
    pub entry_count: usize,
}

/// What `sync(...)` actually did.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The plan was empty: L, C, and R already agree.
    UpToDate,
    /// `dry_run=true`: the plan that *would* run, never applied.
    Preview(SyncPlan),
    /// The transaction committed.
    Committed {
        transaction_id: String,
        snapshot_id: String,
        uploaded: usize,
        downloaded: usize,
        deleted_local: usize,
        deleted_remote: usize,
        cache_repaired: usize,
        cache_cleaned: usize,
    },
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub outcome: SyncOutcome,
}

/// `status(...)`: read-only classification, no transaction opened.
#[derive(Debug, Clone)]
pub struct StatusResult {
    pub classification: BTreeMap<RepoPath, SyncState>,
    pub plan: SyncPlan,
    pub warnings: Vec<ScanWarning>,
}

/// One point in a path's history where its entry changed (or was
/// introduced/removed), newest first.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub snapshot_id: String,
    pub created_at: String,
    pub created_by: String,
    /// `None` means the path did not exist in this snapshot — either
    /// it was deleted here, or this is the boundary before its
    /// introduction.
    pub entry: Option<Entry>,
}

/// `blame(config, path)`: the ordered history of changes to a single
/// path, newest first.
#[derive(Debug, Clone)]
pub struct ChangeHistory {
    pub path: RepoPath,
    pub events: Vec<ChangeEvent>,
}

/// `log(config)`: the full, chain-validated snapshot history, oldest
/// first.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    pub snapshots: Vec<ManifestMetadata>,
}

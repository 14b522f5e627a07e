//! Compiling a classified merge into a `SyncPlan`.

use std::collections::BTreeMap;

use crate::manifest::{Manifest, RepoPath};
use crate::merger::SyncState;

use super::plan::{OperationKind, SyncPlan};

/// Infer which of the three sync kinds this run is, from the shape of
/// the inputs alone: `Init` if the remote manifest is empty and no
/// remote dataset exists yet, `Clone` if the local tree is empty,
/// `Sync` otherwise.
pub fn infer_kind(local_is_empty: bool, remote_is_empty: bool, remote_dataset_exists: bool) -> OperationKind {
    if remote_is_empty && !remote_dataset_exists {
        OperationKind::Init
    } else if local_is_empty {
        OperationKind::Clone
    } else {
        OperationKind::Sync
    }
}

/// Compile a path→state classification into a `SyncPlan`.
///
/// `kind` is threaded through unchanged; the plan itself is purely a
/// function of the classification. `local_archive_ids` and
/// `remote_archive_ids` feed the metadata sync set: any snapshot id
/// present on exactly one side is added to `archive_exchange`.
pub fn build_plan(
    classification: &BTreeMap<RepoPath, SyncState>,
    kind: OperationKind,
    local_archive_ids: &[String],
    remote_archive_ids: &[String],
) -> SyncPlan {
    let mut plan = SyncPlan {
        kind: Some(kind),
        ..SyncPlan::default()
    };

    for (path, state) in classification {
        match state {
            SyncState::AllEqual => {}
            SyncState::RemoteChanged => plan.downloads.push(path.clone()),
            SyncState::LocalChanged => plan.uploads.push(path.clone()),
            SyncState::CacheDrifted => plan.cache_repair.push(path.clone()),
            SyncState::DeletedRemote => plan.delete_local.push(path.clone()),
            SyncState::DeletedLocal => plan.delete_remote.push(path.clone()),
            SyncState::CacheRepairNew => plan.cache_repair.push(path.clone()),
            SyncState::NewLocal => plan.uploads.push(path.clone()),
            SyncState::OrphanedCache => plan.cache_cleanup.push(path.clone()),
            SyncState::NewRemote => plan.downloads.push(path.clone()),
            SyncState::Conflict3Way
            | SyncState::ConflictDeletedRemote
            | SyncState::ConflictDeletedLocal
            | SyncState::ConflictUncachedDivergence => plan.conflicts.push(path.clone()),
        }
    }

    plan.archive_exchange = symmetric_difference(local_archive_ids, remote_archive_ids);

    plan
}

fn symmetric_difference(a: &[String], b: &[String]) -> Vec<String> {
    let mut result: Vec<String> = a.iter().filter(|id| !b.contains(id)).cloned().collect();
    result.extend(b.iter().filter(|id| !a.contains(id)).cloned());
    result.sort();
    result
}

/// Convenience entry point: classify `l`/`c`/`r` and compile the plan
/// in one call.
pub fn plan(
    l: &Manifest,
    c: &Manifest,
    r: &Manifest,
    kind: OperationKind,
    local_archive_ids: &[String],
    remote_archive_ids: &[String],
) -> SyncPlan {
    let classification = crate::merger::merge(l, c, r);
    build_plan(&classification, kind, local_archive_ids, remote_archive_ids)
}

//! Read-only engine entry points: `status` reconciles without opening
//! a transaction, `log` validates and returns the snapshot chain,
//! `blame` walks it for a single path.

use std::path::Path;

use crate::archive;
use crate::client_fs::ClientFilesystem;
use crate::config::RepositoryConfig;
use crate::errors::{DsgError, DsgResult, ErrorKind};
use crate::manifest::hash::snapshot_hash;
use crate::manifest::{Manifest, RepoPath};
use crate::merger;
use crate::planner;
use crate::scanner::{self, IgnoreRules};

use super::core::{self, load_cache, local_archive_ids};
use super::endpoint;
use super::results::{ChangeEvent, ChangeHistory, SnapshotHistory, StatusResult};

/// Classify the working tree against the cache (and, if
/// `include_remote`, the remote) without opening a transaction.
///
/// No lock is taken: this never writes anything, so it can run
/// concurrently with another process's sync.
pub fn status(
    config: &RepositoryConfig,
    root: &Path,
    user_id: &str,
    local_host: &str,
    include_remote: bool,
) -> DsgResult<StatusResult> {
    config.validate()?;

    let ignore = IgnoreRules::new();
    let (l, report) = scanner::scan(root, user_id, &ignore, true, false)?;
    let c = load_cache(root)?;

    let (r, remote_ids, remote_dataset_exists) = if include_remote {
        let transaction_id = uuid::Uuid::new_v4().to_string();
        let (remote, _transport) = endpoint::build(config, root, local_host, &transaction_id)?;
        let r = remote.get_manifest()?;
        let remote_ids = remote.list_snapshots()?;
        let dataset_exists = remote.dataset_exists();
        (r, remote_ids, dataset_exists)
    } else {
        (Manifest::empty(), Vec::new(), false)
    };

    let classification = merger::merge(&l, &c, &r);
    let local_ids = local_archive_ids(root)?;
    let kind = planner::infer_kind(l.is_empty(), r.is_empty(), remote_dataset_exists);
    let plan = planner::build_plan(&classification, kind, &local_ids, &remote_ids);

    Ok(StatusResult {
        classification,
        plan,
        warnings: report.warnings,
    })
}

/// The full, chain-validated snapshot history, oldest first.
///
/// Recomputes every link's `snapshot_hash` and compares it against
/// the recorded value, surfacing any tampering or corruption as
/// `ManifestCorrupt` rather than returning a silently broken chain.
pub fn log(root: &Path) -> DsgResult<SnapshotHistory> {
    let client = ClientFilesystem::new(root);
    let messages = client.read_sync_messages()?;

    let mut previous_hash: Option<String> = None;
    for meta in &messages {
        let expected = snapshot_hash(&meta.entries_hash, &meta.snapshot_message, previous_hash.as_deref());
        if expected != meta.snapshot_hash {
            return Err(DsgError::new(
                ErrorKind::ManifestCorrupt,
                format!("snapshot {} fails hash-chain verification", meta.snapshot_id),
            ));
        }
        previous_hash = Some(meta.snapshot_hash.clone());
    }

    Ok(SnapshotHistory { snapshots: messages })
}

/// The ordered history of changes to a single path, newest first.
///
/// Walks the snapshot chain backward from the current cache, loading
/// each predecessor from the compressed archive, and records a
/// `ChangeEvent` wherever the path's entry differs from its immediate
/// predecessor (including its introduction or deletion).
pub fn blame(root: &Path, path: &RepoPath) -> DsgResult<ChangeHistory> {
    let mut events = Vec::new();

    let mut manifest = load_cache(root)?;
    loop {
        let meta = match manifest.metadata() {
            Some(meta) => meta.clone(),
            None => break,
        };

        let predecessor = match &meta.snapshot_previous {
            Some(prev_id) => Some(archive::read_compressed(root, prev_id)?),
            None => None,
        };

        let current_entry = manifest.get(path);
        let predecessor_entry = predecessor.as_ref().and_then(|m| m.get(path));

        let changed = match (current_entry, predecessor_entry) {
            (Some(a), Some(b)) => !a.content_equals(b),
            (Some(_), None) | (None, Some(_)) => true,
            (None, None) => false,
        };

        if changed {
            events.push(ChangeEvent {
                snapshot_id: meta.snapshot_id.clone(),
                created_at: meta.created_at.clone(),
                created_by: meta.created_by.clone(),
                entry: current_entry.cloned(),
            });
        }

        manifest = match predecessor {
            Some(m) => m,
            None => break,
        };
    }

    Ok(ChangeHistory {
        path: path.clone(),
        events,
    })
}

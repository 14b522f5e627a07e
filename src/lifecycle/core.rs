//! The unified engine: `init`, `clone_repository`, and `sync` all run
//! the same scan/load/merge/plan/transact pipeline, parameterized by
//! `OperationKind`. Only the inputs each kind is allowed to read (and
//! what a successful run produces) differ.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::SecondsFormat;
use uuid::Uuid;

use crate::client_fs::ClientFilesystem;
use crate::config::{ProgressSink, RepositoryConfig};
use crate::coordinator::{self, CoordinatorErrorCode, TransactionOutcome};
use crate::errors::{DsgError, DsgResult, ErrorKind};
use crate::lock::RepositoryLock;
use crate::manifest::{
    format_snapshot_id, hash::snapshot_hash, Entry, Manifest, ManifestMetadata, RepoPath,
    MANIFEST_VERSION,
};
use crate::merger::{self, SyncState};
use crate::observability::{
    log_event, log_event_with_fields, AuditAction, AuditLog, AuditOutcome, AuditRecord, Event,
    FileAuditLog,
};
use crate::planner::{self, OperationKind, SyncPlan};
use crate::repo_layout;
use crate::scanner::{self, IgnoreRules, ScanWarning};

use super::endpoint;
use super::results::{CloneResult, InitResult, SyncOutcome, SyncResult};

/// Fixed UTC offset every snapshot timestamp is recorded at, so
/// `created_at` never depends on the host's local timezone.
pub const PROJECT_TIMEZONE_OFFSET_SECONDS: i32 = 0;

fn now_rfc3339() -> String {
    let offset = chrono::FixedOffset::east_opt(PROJECT_TIMEZONE_OFFSET_SECONDS)
        .expect("fixed zero offset is always valid");
    chrono::Utc::now()
        .with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

enum CoreOutcome {
    UpToDate,
    Preview(SyncPlan),
    Committed(TransactionOutcome, SyncPlan),
}

/// Turn `root` into a freshly initialized repository against `config`,
/// producing the first snapshot (`s1`).
#[allow(clippy::too_many_arguments)]
pub fn init(
    config: &RepositoryConfig,
    root: &Path,
    user_id: &str,
    local_host: &str,
    message: &str,
    force: bool,
    normalize: bool,
    sink: &dyn ProgressSink,
) -> DsgResult<InitResult> {
    log_event(Event::RepoInitStart);
    let outcome = core(
        OperationKind::Init,
        config,
        root,
        user_id,
        local_host,
        message,
        normalize,
        force,
        false,
        sink,
    )?;
    match outcome {
        CoreOutcome::Committed(tx, plan) => {
            log_event(Event::RepoInitComplete);
            Ok(InitResult {
                transaction_id: tx.transaction_id,
                snapshot_id: tx.snapshot_id,
                entry_count: plan.uploads.len(),
            })
        }
        CoreOutcome::UpToDate | CoreOutcome::Preview(_) => {
            Err(DsgError::internal("init produced no transaction"))
        }
    }
}

/// Materialize `root` from an already-initialized remote; downloads
/// everything, commits no new snapshot.
pub fn clone_repository(
    config: &RepositoryConfig,
    root: &Path,
    user_id: &str,
    local_host: &str,
    sink: &dyn ProgressSink,
) -> DsgResult<CloneResult> {
    log_event(Event::RepoCloneStart);
    let outcome = core(
        OperationKind::Clone,
        config,
        root,
        user_id,
        local_host,
        "",
        false,
        true,
        false,
        sink,
    )?;
    match outcome {
        CoreOutcome::Committed(tx, plan) => {
            log_event(Event::RepoCloneComplete);
            Ok(CloneResult {
                transaction_id: tx.transaction_id,
                snapshot_id: tx.snapshot_id,
                entry_count: plan.downloads.len(),
            })
        }
        CoreOutcome::UpToDate | CoreOutcome::Preview(_) => {
            Err(DsgError::internal("clone produced no transaction"))
        }
    }
}

/// Reconcile `root` against `config`'s remote, committing a new
/// snapshot unless the plan is empty or `dry_run` is set.
#[allow(clippy::too_many_arguments)]
pub fn sync(
    config: &RepositoryConfig,
    root: &Path,
    user_id: &str,
    local_host: &str,
    message: &str,
    dry_run: bool,
    force: bool,
    normalize: bool,
    sink: &dyn ProgressSink,
) -> DsgResult<SyncResult> {
    let outcome = core(
        OperationKind::Sync,
        config,
        root,
        user_id,
        local_host,
        message,
        normalize,
        force,
        dry_run,
        sink,
    )?;
    let outcome = match outcome {
        CoreOutcome::UpToDate => SyncOutcome::UpToDate,
        CoreOutcome::Preview(plan) => SyncOutcome::Preview(plan),
        CoreOutcome::Committed(tx, plan) => SyncOutcome::Committed {
            transaction_id: tx.transaction_id,
            snapshot_id: tx.snapshot_id,
            uploaded: plan.uploads.len(),
            downloaded: plan.downloads.len(),
            deleted_local: plan.delete_local.len(),
            deleted_remote: plan.delete_remote.len(),
            cache_repaired: plan.cache_repair.len(),
            cache_cleaned: plan.cache_cleanup.len(),
        },
    };
    Ok(SyncResult { outcome })
}

#[allow(clippy::too_many_arguments)]
fn core(
    kind: OperationKind,
    config: &RepositoryConfig,
    root: &Path,
    user_id: &str,
    local_host: &str,
    message: &str,
    normalize: bool,
    force: bool,
    dry_run: bool,
    sink: &dyn ProgressSink,
) -> DsgResult<CoreOutcome> {
    config.validate()?;
    fs::create_dir_all(repo_layout::meta_dir(root))?;

    // Held for the whole operation; released by `Drop` on every return
    // path, including an early `?` or a panic unwind.
    let _lock = RepositoryLock::acquire(root)?;
    log_event(Event::LockAcquired);

    let audit = FileAuditLog::open(repo_layout::meta_dir(root).join("audit.log"))
        .map_err(|e| DsgError::internal(e.to_string()))?;
    let _ = audit.append(
        &AuditRecord::new(AuditAction::LockAcquire, AuditOutcome::Success).with_user_id(user_id),
    );

    let outcome = run_core(
        kind, config, root, user_id, local_host, message, normalize, force, dry_run, sink, &audit,
    );

    let _ = audit.append(
        &AuditRecord::new(AuditAction::LockRelease, AuditOutcome::Success).with_user_id(user_id),
    );
    log_event(Event::LockReleased);

    outcome
}

#[allow(clippy::too_many_arguments)]
fn run_core(
    kind: OperationKind,
    config: &RepositoryConfig,
    root: &Path,
    user_id: &str,
    local_host: &str,
    message: &str,
    normalize: bool,
    force: bool,
    dry_run: bool,
    sink: &dyn ProgressSink,
    audit: &dyn AuditLog,
) -> DsgResult<CoreOutcome> {
    let client = ClientFilesystem::new(root);
    replay_pending_recovery(&client, root, audit)?;

    let transaction_id = Uuid::new_v4().to_string();
    let (mut remote, mut transport) = endpoint::build(config, root, local_host, &transaction_id)?;

    if kind == OperationKind::Init && remote.dataset_exists() {
        return Err(DsgError::new(
            ErrorKind::ConfigInvalid,
            "remote dataset already exists; this repository is already initialized",
        ));
    }
    if kind == OperationKind::Clone && !remote.dataset_exists() {
        return Err(DsgError::new(
            ErrorKind::ConfigInvalid,
            "remote repository has not been initialized; nothing to clone",
        ));
    }

    let ignore = IgnoreRules::new();
    let (l, warnings): (Manifest, Vec<ScanWarning>) = match kind {
        OperationKind::Init | OperationKind::Sync => {
            log_event(Event::ScanStart);
            let (manifest, report) = scanner::scan(root, user_id, &ignore, true, normalize)?;
            log_event_with_fields(
                Event::ScanComplete,
                &[("entry_count", manifest.len().to_string().as_str())],
            );
            for (from, to) in &report.renames {
                log_event_with_fields(Event::PathNormalized, &[("from", from), ("to", to)]);
            }
            (manifest, report.warnings)
        }
        OperationKind::Clone => (Manifest::empty(), Vec::new()),
    };

    let blocked = !force
        && warnings.iter().any(|w| {
            matches!(
                w,
                ScanWarning::InvalidPath { .. } | ScanWarning::NormalizationCollision { .. }
            )
        });
    if blocked {
        return Err(DsgError::new(
            ErrorKind::ValidationBlocked,
            format!("{} path(s) failed filename validation", warnings.len()),
        ));
    }

    let c = match kind {
        OperationKind::Sync => load_cache(root)?,
        OperationKind::Init | OperationKind::Clone => Manifest::empty(),
    };

    let r = match kind {
        OperationKind::Clone | OperationKind::Sync => remote.get_manifest()?,
        OperationKind::Init => Manifest::empty(),
    };

    let classification = merger::merge(&l, &c, &r);
    log_event(Event::ReconcileComplete);

    let local_ids = local_archive_ids(root)?;
    let remote_ids = remote.list_snapshots()?;
    let plan = planner::build_plan(&classification, kind, &local_ids, &remote_ids);
    log_event_with_fields(
        Event::PlanBuilt,
        &[("operations", plan.total_operations().to_string().as_str())],
    );

    if plan.has_conflicts() {
        for path in &plan.conflicts {
            log_event_with_fields(Event::ConflictDetected, &[("path", path.as_str())]);
            let _ = audit.append(
                &AuditRecord::new(AuditAction::ConflictRefused, AuditOutcome::Rejected)
                    .with_path(path.as_str())
                    .with_user_id(user_id),
            );
            crate::observability::metrics::global().increment_conflicts_detected();
        }
        return Err(DsgError::conflicts_block_sync(plan.conflicts.len()));
    }

    if plan.is_empty() && kind == OperationKind::Sync {
        return Ok(CoreOutcome::UpToDate);
    }
    if dry_run {
        return Ok(CoreOutcome::Preview(plan));
    }

    let new_manifest = match kind {
        OperationKind::Clone => {
            let entries: Vec<(RepoPath, Entry)> =
                r.iter().map(|(p, e)| (p.clone(), e.clone())).collect();
            Manifest::from_entries(entries, r.metadata().cloned())
        }
        OperationKind::Init => {
            let built = build_new_manifest(&l, &r, &classification);
            let metadata = next_metadata(&built, None, user_id, message);
            built.with_metadata(metadata)
        }
        OperationKind::Sync => {
            let built = build_new_manifest(&l, &r, &classification);
            let metadata = next_metadata(&built, r.metadata(), user_id, message);
            built.with_metadata(metadata)
        }
    };

    let _ = audit.append(
        &AuditRecord::new(AuditAction::TransactionBegin, AuditOutcome::Pending)
            .with_transaction_id(&transaction_id)
            .with_user_id(user_id),
    );
    log_event_with_fields(Event::TransactionBegin, &[("transaction_id", &transaction_id)]);

    let remote_root = remote.content_root().to_path_buf();
    let result = coordinator::run_transaction(
        &client,
        &mut remote,
        &mut transport,
        &transaction_id,
        &plan,
        &new_manifest,
        root,
        sink,
    );

    let tx_outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            if err.code() == CoordinatorErrorCode::ClientCommitExhausted {
                log_event(Event::ClientCommitExhausted);
                let _ = audit.append(
                    &AuditRecord::new(AuditAction::ClientCommitExhausted, AuditOutcome::Failed)
                        .with_transaction_id(&transaction_id)
                        .with_error(err.to_string())
                        .with_user_id(user_id),
                );
            } else {
                log_event(Event::TransactionRolledBack);
                let _ = audit.append(
                    &AuditRecord::new(AuditAction::TransactionRollback, AuditOutcome::Failed)
                        .with_transaction_id(&transaction_id)
                        .with_error(err.to_string())
                        .with_user_id(user_id),
                );
            }
            return Err(err.into());
        }
    };

    log_event(Event::RemoteCommitted);
    log_event(Event::ClientCommitted);
    let _ = audit.append(
        &AuditRecord::new(AuditAction::RemoteCommit, AuditOutcome::Success)
            .with_transaction_id(&transaction_id)
            .with_user_id(user_id),
    );
    let _ = audit.append(
        &AuditRecord::new(AuditAction::ClientCommit, AuditOutcome::Success)
            .with_transaction_id(&transaction_id)
            .with_user_id(user_id),
    );

    let predecessor = match kind {
        OperationKind::Sync => r,
        OperationKind::Init | OperationKind::Clone => Manifest::empty(),
    };
    let archived = !predecessor.is_empty();
    coordinator::archive_predecessor(root, &remote_root, &predecessor)?;
    if archived {
        log_event(Event::PredecessorArchived);
    }

    Ok(CoreOutcome::Committed(tx_outcome, plan))
}

/// Re-apply any commit marker left behind by an interrupted client
/// commit, then clear the marker. A no-op if no recovery is pending.
fn replay_pending_recovery(
    client: &ClientFilesystem,
    root: &Path,
    audit: &dyn AuditLog,
) -> DsgResult<()> {
    let marker = repo_layout::needs_recovery_path(root);
    if !marker.exists() {
        return Ok(());
    }

    let staging_root = repo_layout::staging_root(root);
    if staging_root.exists() {
        for entry in fs::read_dir(&staging_root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(tx_id) = entry.file_name().to_str() {
                // Transport scratch directories (`xfer-<tx>`, created by
                // `endpoint::build`) live alongside the client's own
                // `<tx>` staging directories under the same parent; only
                // the latter are meaningful to `ClientFilesystem::recover`.
                if tx_id.starts_with("xfer-") {
                    continue;
                }
                client.recover(tx_id)?;
                log_event_with_fields(Event::RecoveryReplayed, &[("transaction_id", tx_id)]);
                let _ = audit.append(
                    &AuditRecord::new(AuditAction::ClientCommit, AuditOutcome::Success)
                        .with_transaction_id(tx_id),
                );
            }
        }
    }

    fs::remove_file(&marker)?;
    Ok(())
}

pub(super) fn load_cache(root: &Path) -> DsgResult<Manifest> {
    let path = repo_layout::last_sync_path(root);
    if !path.exists() {
        return Ok(Manifest::empty());
    }
    let file = fs::File::open(&path)?;
    Ok(Manifest::deserialize(file)?)
}

pub(super) fn local_archive_ids(root: &Path) -> DsgResult<Vec<String>> {
    let dir = repo_layout::archive_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if let Some(id) = name.strip_suffix("-sync.json.lz4") {
                ids.push(id.to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}

/// Select each path's surviving entry for the new cache manifest. Only
/// called once the plan is known to be conflict-free, so the conflict
/// arms are unreachable by construction.
fn build_new_manifest(l: &Manifest, r: &Manifest, classification: &BTreeMap<RepoPath, SyncState>) -> Manifest {
    let mut ordered: Vec<(RepoPath, Entry)> = Vec::with_capacity(classification.len());
    for (path, state) in classification {
        let source = match state {
            SyncState::AllEqual
            | SyncState::LocalChanged
            | SyncState::CacheDrifted
            | SyncState::CacheRepairNew
            | SyncState::NewLocal => l.get(path),
            SyncState::RemoteChanged | SyncState::NewRemote => r.get(path),
            SyncState::DeletedRemote | SyncState::DeletedLocal | SyncState::OrphanedCache => None,
            SyncState::Conflict3Way
            | SyncState::ConflictDeletedRemote
            | SyncState::ConflictDeletedLocal
            | SyncState::ConflictUncachedDivergence => {
                unreachable!("conflicts are rejected before the new manifest is built")
            }
        };
        if let Some(entry) = source {
            ordered.push((path.clone(), entry.clone()));
        }
    }
    Manifest::from_entries(ordered, None)
}

/// Build the metadata for the snapshot `new_manifest` is about to
/// become, chained off `previous` (the prior head, or `None` for the
/// very first snapshot).
fn next_metadata(
    new_manifest: &Manifest,
    previous: Option<&ManifestMetadata>,
    user_id: &str,
    message: &str,
) -> ManifestMetadata {
    let entries_hash = new_manifest.compute_entries_hash();
    let sequence = previous.and_then(|m| m.sequence_number()).unwrap_or(0) + 1;
    let previous_hash = previous.map(|m| m.snapshot_hash.as_str());

    ManifestMetadata {
        manifest_version: MANIFEST_VERSION,
        snapshot_id: format_snapshot_id(sequence),
        created_at: now_rfc3339(),
        created_by: user_id.to_string(),
        entry_count: new_manifest.len(),
        entries_hash: entries_hash.clone(),
        snapshot_previous: previous.map(|m| m.snapshot_id.clone()),
        snapshot_hash: snapshot_hash(&entries_hash, message, previous_hash),
        snapshot_message: message.to_string(),
        snapshot_notes: String::new(),
    }
}

//! Transaction coordinator: two-phase commit binding the client
//! filesystem, the remote filesystem, and the transport, per the
//! five-step protocol (begin, apply plan, metadata exchange,
//! pre-commit validation, commit-or-rollback).
//!
//! One sync operation is one transaction: every upload, download,
//! deletion, and metadata write either lands together or is rolled
//! back together. There are no partial commits and no resumable
//! checkpoints — a failed transaction is recovered by re-running the
//! sync, not by resuming this one.

mod errors;

pub use errors::{CoordinatorError, CoordinatorErrorCode, CoordinatorResult};

use std::path::{Path, PathBuf};

use crate::client_fs::{ClientFilesystem, ClientTransaction};
use crate::config::{OperationLabel, OperationOutcome, OperationStep, ProgressSink};
use crate::crash_point::{maybe_crash, points};
use crate::manifest::{Manifest, ManifestMetadata, RepoPath};
use crate::observability::metrics;
use crate::planner::SyncPlan;
use crate::remote_fs::{RemoteFs, RemoteFsTransaction};
use crate::repo_layout;
use crate::transport::{ContentStream, Transport};

/// Bounded client-commit retry count (step 5): the remote is already
/// durable by the time these retries happen, so they are pure local
/// filesystem operations expected to be fast — no backoff.
const CLIENT_COMMIT_RETRY_LIMIT: u32 = 3;

/// What a successful transaction produced.
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub transaction_id: String,
    pub snapshot_id: String,
    /// How many attempts the client-side commit took (1 if it
    /// succeeded on the first try).
    pub client_commit_attempts: u32,
}

/// Runs one full sync transaction: stages `plan`'s operations through
/// `transport`, writes `new_manifest` as the new cache on both sides,
/// validates, and commits (or rolls everything back).
///
/// `new_manifest` must already carry the `ManifestMetadata` for the
/// snapshot this transaction produces (its `entries_hash` is verified
/// against a fresh recomputation as the pre-commit check).
pub fn run_transaction(
    client: &ClientFilesystem,
    remote: &mut RemoteFs,
    transport: &mut dyn Transport,
    transaction_id: &str,
    plan: &SyncPlan,
    new_manifest: &Manifest,
    local_root: &Path,
    sink: &dyn ProgressSink,
) -> CoordinatorResult<TransactionOutcome> {
    let metadata = new_manifest
        .metadata()
        .ok_or_else(|| CoordinatorError::internal("new cache manifest is missing its metadata"))?
        .clone();

    if new_manifest.compute_entries_hash() != metadata.entries_hash {
        return Err(CoordinatorError::entries_hash_mismatch());
    }

    let remote_hash_at_begin = remote.get_manifest()?.compute_entries_hash();
    let remote_root = remote.content_root().to_path_buf();

    // Archive exchange touches only immutable, already-committed
    // history, so it runs as a best-effort step ahead of the
    // two-phase commit rather than inside it: a rollback of the new
    // snapshot never invalidates history that already existed before
    // this transaction began.
    exchange_archives(&remote_root, local_root, &plan.archive_exchange, sink)?;

    // Downloads must be read from the remote's live tree before
    // `remote.begin()` takes an exclusive borrow for the rest of the
    // transaction's lifetime.
    let mut download_sources = Vec::with_capacity(plan.downloads.len());
    for path in &plan.downloads {
        download_sources.push((path.clone(), remote.send(path)?));
    }

    transport.open_session()?;

    let mut affected: Vec<&RepoPath> = Vec::with_capacity(plan.downloads.len() + plan.delete_local.len());
    affected.extend(plan.downloads.iter());
    affected.extend(plan.delete_local.iter());
    let client_tx = client.begin(transaction_id, affected)?;

    let mut remote_tx = remote.begin(transaction_id)?;

    let apply_result = apply_plan(
        client,
        &client_tx,
        &mut remote_tx,
        transport,
        plan,
        new_manifest,
        &metadata,
        download_sources,
        sink,
    );

    if let Err(err) = apply_result {
        let _ = remote_tx.rollback();
        let _ = client_tx.rollback();
        let _ = transport.close_session();
        metrics::global().increment_transactions_rolled_back();
        return Err(err);
    }

    maybe_crash(points::COORDINATOR_AFTER_PRECOMMIT_VALIDATE);

    let fresh_remote_hash = match remote_tx.live_manifest() {
        Ok(m) => m.compute_entries_hash(),
        Err(err) => {
            let _ = remote_tx.rollback();
            let _ = client_tx.rollback();
            let _ = transport.close_session();
            metrics::global().increment_transactions_rolled_back();
            return Err(err.into());
        }
    };
    if fresh_remote_hash != remote_hash_at_begin {
        let _ = remote_tx.rollback();
        let _ = client_tx.rollback();
        let _ = transport.close_session();
        metrics::global().increment_transactions_rolled_back();
        return Err(CoordinatorError::remote_moved_underneath());
    }

    let remote_commit = remote_tx.commit(transaction_id, &metadata.snapshot_id);
    let remote_commit = match remote_commit {
        Ok(result) => result,
        Err(err) => {
            let _ = client_tx.rollback();
            let _ = transport.close_session();
            metrics::global().increment_transactions_rolled_back();
            return Err(err.into());
        }
    };
    maybe_crash(points::COORDINATOR_AFTER_REMOTE_COMMIT);
    debug_assert!(remote_commit.as_deref().map_or(true, |id| id == metadata.snapshot_id));

    maybe_crash(points::COORDINATOR_BEFORE_CLIENT_COMMIT);
    let mut client_commit_attempts = 1u32;
    if let Err(_first_err) = client_tx.commit() {
        loop {
            if client_commit_attempts >= CLIENT_COMMIT_RETRY_LIMIT {
                mark_needs_recovery(local_root)?;
                metrics::global().increment_client_commit_exhausted();
                return Err(CoordinatorError::client_commit_exhausted(client_commit_attempts));
            }
            client_commit_attempts += 1;
            metrics::global().increment_client_commit_retries();
            if client.recover(transaction_id).is_ok() {
                break;
            }
        }
    }
    maybe_crash(points::COORDINATOR_AFTER_CLIENT_COMMIT);

    let _ = transport.close_session();
    metrics::global().increment_transactions_committed();
    metrics::global().increment_snapshots_created();

    Ok(TransactionOutcome {
        transaction_id: transaction_id.to_string(),
        snapshot_id: metadata.snapshot_id,
        client_commit_attempts,
    })
}

/// Archive the manifest a transaction is about to supersede, on both
/// sides, once the transaction that supersedes it has committed. A
/// no-op if `predecessor` is empty (nothing to archive, e.g. `init`).
pub fn archive_predecessor(
    local_root: &Path,
    remote_root: &Path,
    predecessor: &Manifest,
) -> CoordinatorResult<()> {
    if predecessor.is_empty() {
        return Ok(());
    }
    let metadata = predecessor
        .metadata()
        .ok_or_else(|| CoordinatorError::internal("predecessor manifest is missing its metadata"))?;

    if !crate::archive::is_archived(local_root, &metadata.snapshot_id) {
        crate::archive::write_compressed(local_root, &metadata.snapshot_id, predecessor)?;
        metrics::global().increment_archives_written();
    }
    if !crate::archive::is_archived(remote_root, &metadata.snapshot_id) {
        crate::archive::write_compressed(remote_root, &metadata.snapshot_id, predecessor)?;
        metrics::global().increment_archives_written();
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_plan(
    client: &ClientFilesystem,
    client_tx: &ClientTransaction,
    remote_tx: &mut RemoteFsTransaction<'_>,
    transport: &mut dyn Transport,
    plan: &SyncPlan,
    new_manifest: &Manifest,
    metadata: &ManifestMetadata,
    download_sources: Vec<(RepoPath, PathBuf)>,
    sink: &dyn ProgressSink,
) -> CoordinatorResult<()> {
    for path in &plan.uploads {
        let label = OperationLabel::new(OperationStep::Upload, path.as_str());
        let source_path = client_tx.send(path)?;
        let stream = ContentStream::open(&source_path)?;
        let size = stream.size();
        sink.on_operation_start(&label, size);
        let mut handle = transport.send_to_remote(stream)?;
        remote_tx.recv(path, handle.path())?;
        handle.mark_consumed();
        sink.on_operation_end(&label, &OperationOutcome::Success);
        metrics::global().increment_files_uploaded();
        metrics::global().add_bytes_uploaded(size);
    }

    for (path, source_path) in download_sources {
        let label = OperationLabel::new(OperationStep::Download, path.as_str());
        let stream = ContentStream::open(&source_path)?;
        let size = stream.size();
        sink.on_operation_start(&label, size);
        let mut handle = transport.send_to_local(stream)?;
        client_tx.recv(&path, handle.path())?;
        handle.mark_consumed();
        sink.on_operation_end(&label, &OperationOutcome::Success);
        metrics::global().increment_files_downloaded();
        metrics::global().add_bytes_downloaded(size);
    }

    for path in &plan.delete_local {
        let label = OperationLabel::new(OperationStep::DeleteLocal, path.as_str());
        sink.on_operation_start(&label, 1);
        client_tx.delete(path)?;
        sink.on_operation_end(&label, &OperationOutcome::Success);
        metrics::global().increment_files_deleted_local();
    }

    for path in &plan.delete_remote {
        let label = OperationLabel::new(OperationStep::DeleteRemote, path.as_str());
        sink.on_operation_start(&label, 1);
        remote_tx.delete(path)?;
        sink.on_operation_end(&label, &OperationOutcome::Success);
        metrics::global().increment_files_deleted_remote();
    }

    client_tx.put_cache_manifest(new_manifest)?;
    let mut messages = client.read_sync_messages()?;
    messages.push(metadata.clone());
    client_tx.put_sync_messages(&messages)?;
    remote_tx.put_manifest(new_manifest)?;

    Ok(())
}

fn exchange_archives(
    remote_root: &Path,
    local_root: &Path,
    snapshot_ids: &[String],
    sink: &dyn ProgressSink,
) -> CoordinatorResult<()> {
    for id in snapshot_ids {
        let label = OperationLabel::new(OperationStep::ArchiveExchange, id.as_str());
        sink.on_operation_start(&label, 1);

        let local_path = repo_layout::archive_entry_path(local_root, id);
        let remote_path = repo_layout::archive_entry_path(remote_root, id);

        let result = if local_path.exists() && !remote_path.exists() {
            copy_archive(&local_path, &remote_path)
        } else if remote_path.exists() && !local_path.exists() {
            copy_archive(&remote_path, &local_path)
        } else {
            Ok(())
        };

        match result {
            Ok(()) => sink.on_operation_end(&label, &OperationOutcome::Success),
            Err(err) => {
                sink.on_operation_end(&label, &OperationOutcome::Failed(err.to_string()));
                return Err(err);
            }
        }
    }
    Ok(())
}

fn copy_archive(source: &Path, dest: &Path) -> CoordinatorResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, dest)?;
    Ok(())
}

fn mark_needs_recovery(local_root: &Path) -> CoordinatorResult<()> {
    let path = repo_layout::needs_recovery_path(local_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoopProgressSink;
    use crate::manifest::{Entry, FileRef, ManifestMetadata};
    use crate::remote_fs::PlainRemoteFilesystem;
    use crate::transport::LocalTransport;
    use tempfile::TempDir;

    fn metadata(snapshot_id: &str, entries_hash: &str, previous: Option<&str>) -> ManifestMetadata {
        ManifestMetadata {
            manifest_version: 1,
            snapshot_id: snapshot_id.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            created_by: "alice".to_string(),
            entry_count: 1,
            entries_hash: entries_hash.to_string(),
            snapshot_previous: previous.map(|s| s.to_string()),
            snapshot_hash: "irrelevant-for-this-test".to_string(),
            snapshot_message: "initial sync".to_string(),
            snapshot_notes: String::new(),
        }
    }

    #[test]
    fn init_transaction_uploads_a_file_and_commits_on_both_sides() {
        let local_tmp = TempDir::new().unwrap();
        let remote_tmp = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();

        std::fs::write(local_tmp.path().join("a.txt"), b"hello").unwrap();

        let client = ClientFilesystem::new(local_tmp.path());
        let mut remote = RemoteFs::Plain(PlainRemoteFilesystem::new(remote_tmp.path()));
        let mut transport = LocalTransport::new(scratch.path().join("xfer"));

        let mut plan = SyncPlan::default();
        let path = RepoPath::new("a.txt").unwrap();
        plan.uploads.push(path.clone());

        let entry = Entry::File(FileRef::new(5, "2026-01-01T00:00:00Z", "h1", "alice"));
        let new_manifest = Manifest::from_entries(vec![(path.clone(), entry)], None);
        let entries_hash = new_manifest.compute_entries_hash();
        let new_manifest = new_manifest.with_metadata(metadata("s1", &entries_hash, None));

        let sink = NoopProgressSink;
        let outcome = run_transaction(
            &client,
            &mut remote,
            &mut transport,
            "tx-1",
            &plan,
            &new_manifest,
            local_tmp.path(),
            &sink,
        )
        .unwrap();

        assert_eq!(outcome.snapshot_id, "s1");
        assert_eq!(outcome.client_commit_attempts, 1);
        assert_eq!(
            std::fs::read(remote_tmp.path().join("a.txt")).unwrap(),
            b"hello"
        );
        assert_eq!(client.read_sync_messages().unwrap().len(), 1);
        assert!(repo_layout::last_sync_path(local_tmp.path()).exists());
    }

    #[test]
    fn entries_hash_mismatch_is_rejected_before_any_io() {
        let local_tmp = TempDir::new().unwrap();
        let remote_tmp = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();

        let client = ClientFilesystem::new(local_tmp.path());
        let mut remote = RemoteFs::Plain(PlainRemoteFilesystem::new(remote_tmp.path()));
        let mut transport = LocalTransport::new(scratch.path().join("xfer"));

        let plan = SyncPlan::default();
        let path = RepoPath::new("a.txt").unwrap();
        let entry = Entry::File(FileRef::new(5, "2026-01-01T00:00:00Z", "h1", "alice"));
        let new_manifest = Manifest::from_entries(vec![(path, entry)], None)
            .with_metadata(metadata("s1", "not-the-real-hash", None));

        let sink = NoopProgressSink;
        let err = run_transaction(
            &client,
            &mut remote,
            &mut transport,
            "tx-1",
            &plan,
            &new_manifest,
            local_tmp.path(),
            &sink,
        )
        .unwrap_err();

        assert_eq!(err.code(), CoordinatorErrorCode::EntriesHashMismatch);
        assert!(!repo_layout::last_sync_path(local_tmp.path()).exists());
    }

    #[test]
    fn download_and_delete_remote_are_applied_in_one_transaction() {
        let local_tmp = TempDir::new().unwrap();
        let remote_tmp = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();

        std::fs::write(remote_tmp.path().join("b.txt"), b"from remote").unwrap();
        std::fs::write(remote_tmp.path().join("stale.txt"), b"stale").unwrap();

        let client = ClientFilesystem::new(local_tmp.path());
        let mut remote = RemoteFs::Plain(PlainRemoteFilesystem::new(remote_tmp.path()));
        let mut transport = LocalTransport::new(scratch.path().join("xfer"));

        let mut plan = SyncPlan::default();
        let b = RepoPath::new("b.txt").unwrap();
        let stale = RepoPath::new("stale.txt").unwrap();
        plan.downloads.push(b.clone());
        plan.delete_remote.push(stale);

        let entry = Entry::File(FileRef::new(11, "2026-01-01T00:00:00Z", "h2", "alice"));
        let new_manifest = Manifest::from_entries(vec![(b, entry)], None);
        let entries_hash = new_manifest.compute_entries_hash();
        let new_manifest = new_manifest.with_metadata(metadata("s1", &entries_hash, None));

        let outcome = run_transaction(
            &client,
            &mut remote,
            &mut transport,
            "tx-1",
            &plan,
            &new_manifest,
            local_tmp.path(),
            &NoopProgressSink,
        )
        .unwrap();

        assert_eq!(outcome.snapshot_id, "s1");
        assert_eq!(
            std::fs::read(local_tmp.path().join("b.txt")).unwrap(),
            b"from remote"
        );
        assert!(!remote_tmp.path().join("stale.txt").exists());
    }
}

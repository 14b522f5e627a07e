//! Snapshot-capable remote, for `snapshot_zfs` repositories. Delegates
//! the copy-on-write init/sync patterns to `zfs_driver::BackendDriver`
//! and layers the remote filesystem's file-staging contract
//! (`recv`/`delete`/`put_manifest`) on top of the driver's
//! single-shot staging closure.

use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::Manifest;
use crate::manifest::RepoPath;
use crate::repo_layout;
use crate::zfs_driver::{BackendDriver, BackendResult, ZfsCommands};

use super::errors::{RemoteFsError, RemoteFsResult};
use super::traits::SnapshotCapable;

pub struct ZfsRemoteFilesystem<C: ZfsCommands> {
    driver: BackendDriver<C>,
    dataset: String,
    mountpoint: PathBuf,
    scratch_root: PathBuf,
}

impl<C: ZfsCommands> ZfsRemoteFilesystem<C> {
    pub fn new(commands: C, dataset: impl Into<String>, mountpoint: impl Into<PathBuf>) -> Self {
        let mountpoint = mountpoint.into();
        Self {
            driver: BackendDriver::new(commands),
            dataset: dataset.into(),
            scratch_root: mountpoint.join(".dsg-scratch"),
            mountpoint,
        }
    }

    pub fn dataset_exists(&self) -> bool {
        self.driver.dataset_exists(&self.dataset)
    }

    /// The dataset's current live mountpoint.
    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    pub fn get_manifest(&self) -> RemoteFsResult<Manifest> {
        let path = repo_layout::last_sync_path(&self.mountpoint);
        if !path.exists() {
            return Ok(Manifest::empty());
        }
        let file = fs::File::open(&path)?;
        Manifest::deserialize(file).map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))
    }

    /// The absolute path of a file currently mounted at the dataset's
    /// live mountpoint (not the transaction's staging clone), for the
    /// coordinator to stream out on a download. Resolved rather than
    /// opened here so a same-host transport can rename it directly
    /// instead of copying its bytes.
    pub fn send(&self, rel_path: &RepoPath) -> RemoteFsResult<PathBuf> {
        let path = self.mountpoint.join(rel_path.as_str());
        fs::metadata(&path)?;
        Ok(path)
    }

    pub fn begin(&mut self, transaction_id: impl Into<String>) -> RemoteFsResult<ZfsRemoteTransaction<'_, C>> {
        let transaction_id = transaction_id.into();
        let staging_dir = self.scratch_root.join(&transaction_id);
        fs::create_dir_all(&staging_dir)?;
        Ok(ZfsRemoteTransaction {
            remote: self,
            transaction_id,
            staging_dir,
            deletions: Vec::new(),
            manifest: None,
        })
    }
}

impl<C: ZfsCommands> SnapshotCapable for ZfsRemoteFilesystem<C> {
    fn list_snapshots(&self) -> RemoteFsResult<Vec<String>> {
        let dir = repo_layout::archive_dir(&self.mountpoint);
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
}

pub struct ZfsRemoteTransaction<'a, C: ZfsCommands> {
    remote: &'a mut ZfsRemoteFilesystem<C>,
    transaction_id: String,
    staging_dir: PathBuf,
    deletions: Vec<RepoPath>,
    manifest: Option<Manifest>,
}

impl<'a, C: ZfsCommands> ZfsRemoteTransaction<'a, C> {
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn recv(&self, rel_path: &RepoPath, source: &Path) -> RemoteFsResult<()> {
        let dest = self.staging_dir.join(rel_path.as_str());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(source, &dest) {
            Ok(()) => {}
            Err(_) => {
                fs::copy(source, &dest)?;
                fs::remove_file(source)?;
            }
        }
        Ok(())
    }

    /// The live remote manifest as it stands outside this
    /// transaction's staging clone, for the coordinator's pre-commit
    /// `RemoteMovedUnderneath` check.
    pub fn live_manifest(&self) -> RemoteFsResult<Manifest> {
        self.remote.get_manifest()
    }

    pub fn delete(&mut self, rel_path: RepoPath) {
        self.deletions.push(rel_path);
    }

    pub fn put_manifest(&mut self, manifest: Manifest) {
        self.manifest = Some(manifest);
    }

    pub fn commit(self, transaction_id_for_dataset: &str, next_snapshot_id: &str) -> RemoteFsResult<String> {
        let ZfsRemoteTransaction { remote, transaction_id, staging_dir, deletions, manifest } = self;

        let dataset_exists = remote.driver.dataset_exists(&remote.dataset);
        let snapshot_id = if !dataset_exists {
            let temp_mountpoint = remote.scratch_root.join(format!("init-{}", transaction_id));
            remote
                .driver
                .run_init(
                    &remote.dataset,
                    &remote.mountpoint,
                    &temp_mountpoint,
                    transaction_id_for_dataset,
                    |mount| apply_staged(&staging_dir, &deletions, manifest.as_ref(), mount),
                )
                .map_err(|e| RemoteFsError::backend_failure(e.to_string()))?
        } else {
            let clone_mountpoint = remote.scratch_root.join(format!("clone-{}", transaction_id));
            let (id, _cleanup_pending) = remote
                .driver
                .run_sync(
                    &remote.dataset,
                    &clone_mountpoint,
                    transaction_id_for_dataset,
                    next_snapshot_id,
                    |mount| apply_staged(&staging_dir, &deletions, manifest.as_ref(), mount),
                )
                .map_err(|e| RemoteFsError::backend_failure(e.to_string()))?;
            id
        };

        if staging_dir.exists() {
            let _ = fs::remove_dir_all(&staging_dir);
        }
        Ok(snapshot_id)
    }

    pub fn rollback(self) -> RemoteFsResult<()> {
        if self.staging_dir.exists() {
            fs::remove_dir_all(&self.staging_dir)?;
        }
        Ok(())
    }
}

fn apply_staged(
    staging_dir: &Path,
    deletions: &[RepoPath],
    manifest: Option<&Manifest>,
    target_mountpoint: &Path,
) -> BackendResult<()> {
    use crate::zfs_driver::BackendError;

    for entry in walkdir::WalkDir::new(staging_dir).into_iter() {
        let entry = entry.map_err(|e| BackendError::command_failed(format!("walking staging dir: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(staging_dir)
            .expect("walked under staging_dir");
        let dest = target_mountpoint.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BackendError::command_failed(e.to_string()))?;
        }
        fs::copy(entry.path(), &dest).map_err(|e| BackendError::command_failed(e.to_string()))?;
    }

    for rel_path in deletions {
        let target = target_mountpoint.join(rel_path.as_str());
        if target.exists() {
            fs::remove_file(target).map_err(|e| BackendError::command_failed(e.to_string()))?;
        }
    }

    if let Some(manifest) = manifest {
        let dest = repo_layout::last_sync_path(target_mountpoint);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BackendError::command_failed(e.to_string()))?;
        }
        let file = fs::File::create(&dest).map_err(|e| BackendError::command_failed(e.to_string()))?;
        manifest
            .serialize(file, true)
            .map_err(|e| BackendError::command_failed(e.to_string()))?;
    }

    Ok(())
}

//! Transactional staging over the client working tree.
//!
//! `begin`/`send`/`recv`/`delete`/`commit`/`rollback`, as specified:
//! inbound bytes and deletions are staged locally so the transaction
//! either commits in full or leaves the working tree untouched.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::crash_point::{maybe_crash, points};
use crate::manifest::{Manifest, ManifestMetadata, RepoPath};
use crate::repo_layout;

use super::errors::{ClientFsError, ClientFsResult};
use super::marker::{CommitMarker, CommitMarkerFile};

/// Owns the working-tree root; `begin` opens a transaction scoped to a
/// single transaction id.
#[derive(Debug, Clone)]
pub struct ClientFilesystem {
    root: PathBuf,
}

impl ClientFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a transaction. `affected` lists paths that may be
    /// overwritten or deleted by this transaction; their current
    /// content is backed up so `rollback` can restore them.
    pub fn begin<'a>(
        &'a self,
        transaction_id: impl Into<String>,
        affected: impl IntoIterator<Item = &'a RepoPath>,
    ) -> ClientFsResult<ClientTransaction<'a>> {
        let transaction_id = transaction_id.into();
        let staging_dir = repo_layout::staging_dir(&self.root, &transaction_id);
        let backup_dir = staging_dir.join(".backup");
        let deletions_dir = repo_layout::deletions_dir(&self.root, &transaction_id);

        fs::create_dir_all(&staging_dir)?;
        fs::create_dir_all(&backup_dir)?;
        fs::create_dir_all(&deletions_dir)?;

        for path in affected {
            let live = self.root.join(path.as_str());
            if live.exists() {
                let backup = backup_dir.join(path.as_str());
                if let Some(parent) = backup.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&live, &backup)?;
            }
        }

        Ok(ClientTransaction {
            fs: self,
            transaction_id,
            staging_dir,
            backup_dir,
            deletions_dir,
        })
    }

    /// Whether a previous commit left a marker behind (crash between
    /// writing the marker and removing it at the end of `commit`).
    pub fn needs_recovery(&self, transaction_id: &str) -> bool {
        let staging_dir = repo_layout::staging_dir(&self.root, transaction_id);
        CommitMarkerFile::new(&staging_dir).exists()
    }

    /// The chronological snapshot history as currently recorded at
    /// `<meta>/sync-messages.json`, oldest first. Empty if this
    /// working tree has never completed a sync.
    pub fn read_sync_messages(&self) -> ClientFsResult<Vec<ManifestMetadata>> {
        let path = repo_layout::sync_messages_path(&self.root);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)?;
        serde_json::from_reader(file).map_err(|e| ClientFsError::marker_corrupt(e.to_string()))
    }

    /// Resume a transaction left behind by a crashed commit: re-apply
    /// its recorded moves and deletions (both idempotent), then clean
    /// up staging.
    pub fn recover(&self, transaction_id: &str) -> ClientFsResult<()> {
        let staging_dir = repo_layout::staging_dir(&self.root, transaction_id);
        let marker_file = CommitMarkerFile::new(&staging_dir);
        if let Some(marker) = marker_file.read()? {
            apply_marker(&self.root, &staging_dir, &marker)?;
            marker_file.remove()?;
        }
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir)?;
        }
        Ok(())
    }
}

/// A transaction scoped to a single `transaction_id`. Dropped without
/// committing leaves the staging directory behind for later recovery
/// or explicit rollback — it is never silently discarded.
pub struct ClientTransaction<'a> {
    fs: &'a ClientFilesystem,
    transaction_id: String,
    staging_dir: PathBuf,
    backup_dir: PathBuf,
    deletions_dir: PathBuf,
}

impl<'a> ClientTransaction<'a> {
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// The absolute path of a file currently in the working tree, for
    /// the coordinator to stream out on an upload. Resolved rather than
    /// opened here so a same-host transport can rename it directly
    /// instead of copying its bytes.
    pub fn send(&self, rel_path: &RepoPath) -> ClientFsResult<PathBuf> {
        let path = self.fs.root.join(rel_path.as_str());
        fs::metadata(&path)?;
        Ok(path)
    }

    /// Move `source` (an already-staged temp file, e.g. produced by
    /// the transport) into staging under `rel_path`.
    pub fn recv(&self, rel_path: &RepoPath, source: &Path) -> ClientFsResult<()> {
        let dest = self.staging_dir.join(rel_path.as_str());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        move_file(source, &dest)?;
        maybe_crash(points::CLIENT_FS_AFTER_STAGE_FILE);
        Ok(())
    }

    /// Stage the new cache manifest at `<meta>/last-sync.json`, moved
    /// into place by the same marker-driven commit as every other
    /// staged file.
    pub fn put_cache_manifest(&self, manifest: &Manifest) -> ClientFsResult<()> {
        let dest = repo_layout::last_sync_path(&self.staging_dir);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(dest)?;
        manifest
            .serialize(file, true)
            .map_err(|e| ClientFsError::marker_corrupt(e.to_string()))
    }

    /// Stage the full, updated `<meta>/sync-messages.json` history.
    pub fn put_sync_messages(&self, messages: &[ManifestMetadata]) -> ClientFsResult<()> {
        let dest = repo_layout::sync_messages_path(&self.staging_dir);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(dest)?;
        serde_json::to_writer_pretty(file, messages)
            .map_err(|e| ClientFsError::marker_corrupt(e.to_string()))
    }

    /// Mark `rel_path` for deletion on commit.
    pub fn delete(&self, rel_path: &RepoPath) -> ClientFsResult<()> {
        let marker = self.deletions_dir.join(rel_path.as_str());
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(marker)?;
        Ok(())
    }

    /// Atomically move staged files into place and apply deletions.
    ///
    /// The commit marker is written before any move is performed, so
    /// a crash at any point after it is durable can be recovered by
    /// re-applying the recorded moves; each move is idempotent
    /// (skipped if the source is already gone and the destination
    /// already exists).
    pub fn commit(self) -> ClientFsResult<()> {
        let moves = collect_staged_moves(&self.staging_dir)?;
        let deletions = collect_deletion_markers(&self.deletions_dir)?;

        let marker = CommitMarker {
            transaction_id: self.transaction_id.clone(),
            moves,
            deletions,
        };

        let marker_file = CommitMarkerFile::new(&self.staging_dir);
        maybe_crash(points::CLIENT_FS_BEFORE_COMMIT_MARKER);
        marker_file.write_atomic(&marker)?;
        maybe_crash(points::CLIENT_FS_AFTER_COMMIT_MARKER);

        apply_marker(&self.fs.root, &self.staging_dir, &marker)?;

        marker_file.remove()?;
        fs::remove_dir_all(&self.staging_dir)?;
        Ok(())
    }

    /// Restore any backed-up files and discard staging. Only valid
    /// before `commit` is called — once the commit marker exists, the
    /// transaction must be recovered forward, not rolled back.
    pub fn rollback(self) -> ClientFsResult<()> {
        if self.backup_dir.exists() {
            for entry in walk_files(&self.backup_dir)? {
                let rel = entry.strip_prefix(&self.backup_dir).expect("walked under backup_dir");
                let dest = self.fs.root.join(rel);
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&entry, &dest)?;
            }
        }
        fs::remove_dir_all(&self.staging_dir)?;
        Ok(())
    }
}

/// Move `source` to `dest`, falling back to copy-then-remove when
/// `rename` fails because they're on different filesystems.
fn move_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, dest)?;
            fs::remove_file(source)?;
            Ok(())
        }
    }
}

fn collect_staged_moves(staging_dir: &Path) -> ClientFsResult<Vec<(String, String)>> {
    let mut moves = Vec::new();
    for path in walk_files(staging_dir)? {
        let rel = path.strip_prefix(staging_dir).expect("walked under staging_dir");
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if rel_str == "commit.marker" || rel_str == "commit.marker.tmp" {
            continue;
        }
        if rel_str.starts_with(".backup/") || rel_str.starts_with(".deletions/") {
            continue;
        }
        moves.push((rel_str.clone(), rel_str));
    }
    moves.sort();
    Ok(moves)
}

fn collect_deletion_markers(deletions_dir: &Path) -> ClientFsResult<Vec<String>> {
    if !deletions_dir.exists() {
        return Ok(Vec::new());
    }
    let mut deletions: Vec<String> = walk_files(deletions_dir)?
        .into_iter()
        .map(|path| {
            path.strip_prefix(deletions_dir)
                .expect("walked under deletions_dir")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    deletions.sort();
    Ok(deletions)
}

fn apply_marker(root: &Path, staging_dir: &Path, marker: &CommitMarker) -> ClientFsResult<()> {
    for (staged_rel, final_rel) in &marker.moves {
        let source = staging_dir.join(staged_rel);
        let dest = root.join(final_rel);
        if !source.exists() {
            // Already applied by a prior, interrupted commit attempt.
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        move_file(&source, &dest)?;
        maybe_crash(points::CLIENT_FS_AFTER_MOVE_ONE_FILE);
    }

    for rel in &marker.deletions {
        let target = root.join(rel);
        if target.exists() {
            fs::remove_file(&target)?;
        }
    }
    maybe_crash(points::CLIENT_FS_AFTER_APPLY_DELETIONS);

    Ok(())
}

fn walk_files(root: &Path) -> ClientFsResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    for entry in walkdir::WalkDir::new(root).into_iter() {
        let entry = entry.map_err(|e| ClientFsError::io("walking directory", e.into()))?;
        if entry.file_type().is_file() {
            out.push(entry.path().to_path_buf());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn path(p: &str) -> RepoPath {
        RepoPath::new(p).unwrap()
    }

    #[test]
    fn commit_moves_staged_file_into_working_tree() {
        let tmp = TempDir::new().unwrap();
        let fs = ClientFilesystem::new(tmp.path());
        let tx = fs.begin("tx-1", std::iter::empty()).unwrap();

        let src = tmp.path().join("incoming.txt");
        std::fs::write(&src, b"hello").unwrap();
        tx.recv(&path("a.txt"), &src).unwrap();
        tx.commit().unwrap();

        assert_eq!(std::fs::read(tmp.path().join("a.txt")).unwrap(), b"hello");
        assert!(!repo_layout::staging_dir(tmp.path(), "tx-1").exists());
    }

    #[test]
    fn commit_applies_deletions() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("gone.txt"), b"bye").unwrap();

        let fs = ClientFilesystem::new(tmp.path());
        let gone = path("gone.txt");
        let tx = fs.begin("tx-1", [&gone]).unwrap();
        tx.delete(&gone).unwrap();
        tx.commit().unwrap();

        assert!(!tmp.path().join("gone.txt").exists());
    }

    #[test]
    fn rollback_restores_backed_up_file_and_removes_staging() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"original").unwrap();

        let fs = ClientFilesystem::new(tmp.path());
        let a = path("a.txt");
        let tx = fs.begin("tx-1", [&a]).unwrap();

        std::fs::write(tmp.path().join("a.txt"), b"changed-outside-transaction").unwrap();
        tx.rollback().unwrap();

        assert_eq!(std::fs::read(tmp.path().join("a.txt")).unwrap(), b"original");
        assert!(!repo_layout::staging_dir(tmp.path(), "tx-1").exists());
    }

    #[test]
    fn recover_reapplies_marker_left_by_interrupted_commit() {
        let tmp = TempDir::new().unwrap();
        let fs = ClientFilesystem::new(tmp.path());
        let tx = fs.begin("tx-1", std::iter::empty()).unwrap();

        let src = tmp.path().join("incoming.txt");
        std::fs::write(&src, b"hello").unwrap();
        tx.recv(&path("a.txt"), &src).unwrap();

        // Simulate a crash right after the marker is written: apply
        // the marker manually instead of calling commit().
        let moves = collect_staged_moves(&repo_layout::staging_dir(tmp.path(), "tx-1")).unwrap();
        let marker = CommitMarker {
            transaction_id: "tx-1".to_string(),
            moves,
            deletions: vec![],
        };
        let staging_dir = repo_layout::staging_dir(tmp.path(), "tx-1");
        CommitMarkerFile::new(&staging_dir).write_atomic(&marker).unwrap();

        assert!(fs.needs_recovery("tx-1"));
        fs.recover("tx-1").unwrap();

        assert_eq!(std::fs::read(tmp.path().join("a.txt")).unwrap(), b"hello");
        assert!(!fs.needs_recovery("tx-1"));
    }
}

//! Plain-filesystem remote, for `filesystem_xfs` and
//! `content_addressed_p2p` repositories: backs onto a local-or-mounted
//! directory tree. "Snapshot" is simulated with a rename-based
//! generation counter; there is no copy-on-write, so this variant
//! does not implement `SnapshotCapable`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::client_fs::{CommitMarker, CommitMarkerFile};
use crate::crash_point::{maybe_crash, points};
use crate::manifest::{Manifest, RepoPath};
use crate::repo_layout;

use super::errors::{RemoteFsError, RemoteFsResult};

/// Relative path (from the staging directory) the staged manifest is
/// written to by `put_manifest`.
const STAGED_MANIFEST_NAME: &str = "last-sync.json";

#[derive(Debug, Clone)]
pub struct PlainRemoteFilesystem {
    root: PathBuf,
}

impl PlainRemoteFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dataset_exists(&self) -> bool {
        repo_layout::last_sync_path(&self.root).exists()
    }

    pub fn get_manifest(&self) -> RemoteFsResult<Manifest> {
        let path = repo_layout::last_sync_path(&self.root);
        if !path.exists() {
            return Ok(Manifest::empty());
        }
        let file = fs::File::open(&path)?;
        Manifest::deserialize(file).map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))
    }

    /// The absolute path of a file currently committed to the remote
    /// tree (not staging), for the coordinator to stream out on a
    /// download. Resolved rather than opened here so a same-host
    /// transport can rename it directly instead of copying its bytes.
    pub fn send(&self, rel_path: &RepoPath) -> RemoteFsResult<PathBuf> {
        let path = self.root.join(rel_path.as_str());
        fs::metadata(&path)?;
        Ok(path)
    }

    pub fn list_snapshots(&self) -> RemoteFsResult<Vec<String>> {
        let dir = repo_layout::archive_dir(&self.root);
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

    pub fn begin(&self, transaction_id: impl Into<String>) -> RemoteFsResult<PlainRemoteTransaction<'_>> {
        let transaction_id = transaction_id.into();
        let staging_dir = repo_layout::staging_dir(&self.root, &transaction_id);
        fs::create_dir_all(&staging_dir)?;
        Ok(PlainRemoteTransaction { remote: self, transaction_id, staging_dir })
    }

    /// Whether a previous commit left a marker behind (crashed between
    /// writing the marker and removing it at the end of `commit`).
    pub fn needs_recovery(&self, transaction_id: &str) -> bool {
        let staging_dir = repo_layout::staging_dir(&self.root, transaction_id);
        CommitMarkerFile::new(&staging_dir).exists()
    }

    /// Resume a transaction left behind by a crashed commit: re-apply
    /// its recorded moves and deletions (both idempotent), then clean
    /// up staging.
    pub fn recover(&self, transaction_id: &str) -> RemoteFsResult<()> {
        let staging_dir = repo_layout::staging_dir(&self.root, transaction_id);
        let marker_file = CommitMarkerFile::new(&staging_dir);
        if let Some(marker) = marker_file
            .read()
            .map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))?
        {
            apply_marker(&self.root, &staging_dir, &marker)?;
            marker_file
                .remove()
                .map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))?;
        }
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir)?;
        }
        Ok(())
    }
}

pub struct PlainRemoteTransaction<'a> {
    remote: &'a PlainRemoteFilesystem,
    transaction_id: String,
    staging_dir: PathBuf,
}

impl<'a> PlainRemoteTransaction<'a> {
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
        maybe_crash(points::REMOTE_FS_AFTER_STAGE_FILE);
        Ok(())
    }

    /// The live remote manifest as it stands outside this
    /// transaction's staging, for the coordinator's pre-commit
    /// `RemoteMovedUnderneath` check.
    pub fn live_manifest(&self) -> RemoteFsResult<Manifest> {
        self.remote.get_manifest()
    }

    pub fn delete(&self, rel_path: &RepoPath) -> RemoteFsResult<()> {
        let marker = self.staging_dir.join(".deletions").join(rel_path.as_str());
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::File::create(marker)?;
        Ok(())
    }

    pub fn put_manifest(&self, manifest: &Manifest) -> RemoteFsResult<()> {
        maybe_crash(points::REMOTE_FS_BEFORE_MANIFEST_WRITE);
        let path = self.staging_dir.join("last-sync.json");
        let file = fs::File::create(path)?;
        manifest
            .serialize(file, true)
            .map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))
    }

    /// Move staged content into the working set and the new manifest
    /// into place. There is no real snapshot here; the "generation" is
    /// simply the new `last-sync.json` replacing the old one.
    ///
    /// The commit marker is written before any move is performed, so a
    /// crash at any point after it is durable can be recovered by
    /// re-applying the recorded moves; each move is idempotent
    /// (skipped if the source is already gone and the destination
    /// already exists).
    pub fn commit(self) -> RemoteFsResult<()> {
        let moves = collect_staged_moves(&self.staging_dir)?;
        let deletions = collect_deletion_markers(&self.staging_dir.join(".deletions"))?;

        let marker = CommitMarker {
            transaction_id: self.transaction_id.clone(),
            moves,
            deletions,
        };

        let marker_file = CommitMarkerFile::new(&self.staging_dir);
        maybe_crash(points::REMOTE_FS_BEFORE_COMMIT_MARKER);
        marker_file
            .write_atomic(&marker)
            .map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))?;
        maybe_crash(points::REMOTE_FS_AFTER_COMMIT_MARKER);

        apply_marker(&self.remote.root, &self.staging_dir, &marker)?;

        marker_file
            .remove()
            .map_err(|e| RemoteFsError::manifest_corrupt(e.to_string()))?;
        fs::remove_dir_all(&self.staging_dir)?;
        Ok(())
    }

    pub fn rollback(self) -> RemoteFsResult<()> {
        if self.staging_dir.exists() {
            fs::remove_dir_all(&self.staging_dir)?;
        }
        Ok(())
    }
}

/// Relative path, from the remote root, the manifest ultimately lands
/// at: `<meta>/last-sync.json`.
fn final_manifest_rel() -> String {
    format!("{}/{}", repo_layout::META_DIR_NAME, STAGED_MANIFEST_NAME)
}

/// `(staged_relative_path, final_relative_path)` pairs for every
/// regular content file and the staged manifest, excluding the
/// `.deletions/` marker tree. Content files keep their relative path;
/// the manifest maps to its `<meta>/` destination.
fn collect_staged_moves(staging_dir: &Path) -> RemoteFsResult<Vec<(String, String)>> {
    let mut moves = Vec::new();
    for path in walk_files(staging_dir)? {
        let rel = path.strip_prefix(staging_dir).expect("walked under staging_dir");
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if rel_str.starts_with(".deletions/") {
            continue;
        }
        if rel_str == STAGED_MANIFEST_NAME {
            moves.push((rel_str, final_manifest_rel()));
        } else {
            moves.push((rel_str.clone(), rel_str));
        }
    }
    moves.sort();
    Ok(moves)
}

fn collect_deletion_markers(deletions_dir: &Path) -> RemoteFsResult<Vec<String>> {
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

/// Apply a commit marker's recorded moves and deletions to
/// `remote_root`, creating any needed parent directories. Idempotent:
/// a move whose source is already gone (applied by a prior,
/// interrupted attempt) is skipped rather than treated as an error.
fn apply_marker(remote_root: &Path, staging_dir: &Path, marker: &CommitMarker) -> RemoteFsResult<()> {
    for (staged_rel, final_rel) in &marker.moves {
        let source = staging_dir.join(staged_rel);
        let dest = remote_root.join(final_rel);
        if !source.exists() {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(&source, &dest) {
            Ok(()) => {}
            Err(_) => {
                fs::copy(&source, &dest)?;
                fs::remove_file(&source)?;
            }
        }
        maybe_crash(points::REMOTE_FS_AFTER_MOVE_ONE_FILE);
    }

    for rel in &marker.deletions {
        let target = remote_root.join(rel);
        if target.exists() {
            fs::remove_file(&target)?;
        }
    }
    maybe_crash(points::REMOTE_FS_AFTER_APPLY_DELETIONS);

    Ok(())
}

fn walk_files(root: &Path) -> RemoteFsResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }
    for entry in walkdir::WalkDir::new(root).into_iter() {
        let entry = entry.map_err(|e| RemoteFsError::io("walking directory", e.into()))?;
        if entry.file_type().is_file() {
            out.push(entry.path().to_path_buf());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Entry, FileRef};
    use tempfile::TempDir;

    #[test]
    fn commit_moves_staged_files_and_manifest_into_place() {
        let tmp = TempDir::new().unwrap();
        let remote = PlainRemoteFilesystem::new(tmp.path());
        let tx = remote.begin("tx-1").unwrap();

        let incoming = tmp.path().join("incoming.txt");
        fs::write(&incoming, b"hello").unwrap();
        tx.recv(&RepoPath::new("a.txt").unwrap(), &incoming).unwrap();

        let manifest = Manifest::from_entries(
            vec![(
                RepoPath::new("a.txt").unwrap(),
                Entry::File(FileRef::new(5, "2026-01-01T00:00:00Z", "h1", "alice")),
            )],
            None,
        );
        tx.put_manifest(&manifest).unwrap();
        tx.commit().unwrap();

        assert_eq!(fs::read(tmp.path().join("a.txt")).unwrap(), b"hello");
        assert!(remote.dataset_exists());
        assert_eq!(remote.get_manifest().unwrap().len(), 1);
    }

    #[test]
    fn rollback_leaves_root_untouched() {
        let tmp = TempDir::new().unwrap();
        let remote = PlainRemoteFilesystem::new(tmp.path());
        let tx = remote.begin("tx-1").unwrap();

        let incoming = tmp.path().join("incoming.txt");
        fs::write(&incoming, b"hello").unwrap();
        tx.recv(&RepoPath::new("a.txt").unwrap(), &incoming).unwrap();
        tx.rollback().unwrap();

        assert!(!tmp.path().join("a.txt").exists());
        assert!(!remote.dataset_exists());
    }

    #[test]
    fn recover_reapplies_marker_left_by_interrupted_commit() {
        let tmp = TempDir::new().unwrap();
        let remote = PlainRemoteFilesystem::new(tmp.path());
        let tx = remote.begin("tx-1").unwrap();

        let incoming = tmp.path().join("incoming.txt");
        fs::write(&incoming, b"hello").unwrap();
        tx.recv(&RepoPath::new("a.txt").unwrap(), &incoming).unwrap();

        let manifest = Manifest::from_entries(
            vec![(
                RepoPath::new("a.txt").unwrap(),
                Entry::File(FileRef::new(5, "2026-01-01T00:00:00Z", "h1", "alice")),
            )],
            None,
        );
        tx.put_manifest(&manifest).unwrap();

        // Simulate a crash right after the marker is written, before
        // any move is applied: write the marker directly instead of
        // calling commit().
        let staging_dir = repo_layout::staging_dir(tmp.path(), "tx-1");
        let moves = collect_staged_moves(&staging_dir).unwrap();
        let marker = CommitMarker {
            transaction_id: "tx-1".to_string(),
            moves,
            deletions: vec![],
        };
        CommitMarkerFile::new(&staging_dir).write_atomic(&marker).unwrap();

        assert!(remote.needs_recovery("tx-1"));
        assert!(!tmp.path().join("a.txt").exists(), "crash happened before any move");

        remote.recover("tx-1").unwrap();

        assert_eq!(fs::read(tmp.path().join("a.txt")).unwrap(), b"hello");
        assert_eq!(remote.get_manifest().unwrap().len(), 1);
        assert!(!remote.needs_recovery("tx-1"));
        assert!(!staging_dir.exists());
    }

    #[test]
    fn recover_is_a_no_op_when_nothing_needs_it() {
        let tmp = TempDir::new().unwrap();
        let remote = PlainRemoteFilesystem::new(tmp.path());

        assert!(!remote.needs_recovery("tx-none"));
        remote.recover("tx-none").unwrap();
    }

    #[test]
    fn list_snapshots_reads_archive_directory() {
        let tmp = TempDir::new().unwrap();
        let remote = PlainRemoteFilesystem::new(tmp.path());
        fs::create_dir_all(repo_layout::archive_dir(tmp.path())).unwrap();
        fs::write(repo_layout::archive_entry_path(tmp.path(), "s1"), b"x").unwrap();
        fs::write(repo_layout::archive_entry_path(tmp.path(), "s2"), b"x").unwrap();

        let ids = remote.list_snapshots().unwrap();
        assert_eq!(ids, vec!["s1".to_string(), "s2".to_string()]);
    }
}

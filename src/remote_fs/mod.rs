//! The remote side of a synchronization: a directory tree (and,
//! depending on the repository's configured backend, a copy-on-write
//! snapshot history) that the coordinator exchanges content and
//! manifests with.
//!
//! Backends are modeled as a tagged union rather than a trait object:
//! `PlainRemoteFilesystem` (rename-based, for `filesystem_xfs` and
//! `content_addressed_p2p` repositories) and `ZfsRemoteFilesystem`
//! (copy-on-write, for `snapshot_zfs` repositories, delegating to
//! [`crate::zfs_driver`]) expose genuinely different capabilities —
//! only the latter is [`SnapshotCapable`] — so dispatch is by matching
//! on the variant rather than hiding the difference behind a shared
//! interface.

mod errors;
mod plain;
mod traits;
mod zfs;

pub use errors::{RemoteFsError, RemoteFsErrorCode, RemoteFsResult};
pub use plain::{PlainRemoteFilesystem, PlainRemoteTransaction};
pub use traits::SnapshotCapable;
pub use zfs::{ZfsRemoteFilesystem, ZfsRemoteTransaction};

use crate::manifest::{Manifest, RepoPath};
use crate::zfs_driver::ZfsCliCommands;
use std::path::Path;

/// A remote filesystem, dispatched by the repository's configured
/// backend kind.
pub enum RemoteFs {
    Plain(PlainRemoteFilesystem),
    Zfs(ZfsRemoteFilesystem<ZfsCliCommands>),
}

impl RemoteFs {
    pub fn dataset_exists(&self) -> bool {
        match self {
            RemoteFs::Plain(r) => r.dataset_exists(),
            RemoteFs::Zfs(r) => r.dataset_exists(),
        }
    }

    pub fn get_manifest(&self) -> RemoteFsResult<Manifest> {
        match self {
            RemoteFs::Plain(r) => r.get_manifest(),
            RemoteFs::Zfs(r) => r.get_manifest(),
        }
    }

    pub fn list_snapshots(&self) -> RemoteFsResult<Vec<String>> {
        match self {
            RemoteFs::Plain(r) => r.list_snapshots(),
            RemoteFs::Zfs(r) => r.list_snapshots(),
        }
    }

    /// The absolute path of a file currently live on the remote, for
    /// the coordinator to stream out on a download.
    pub fn send(&self, rel_path: &RepoPath) -> RemoteFsResult<std::path::PathBuf> {
        match self {
            RemoteFs::Plain(r) => r.send(rel_path),
            RemoteFs::Zfs(r) => r.send(rel_path),
        }
    }

    /// The directory the remote's current live content (and its
    /// `archive/` subdirectory) is rooted at, outside any open
    /// transaction's staging.
    pub fn content_root(&self) -> &Path {
        match self {
            RemoteFs::Plain(r) => r.root(),
            RemoteFs::Zfs(r) => r.mountpoint(),
        }
    }

    pub fn begin(&mut self, transaction_id: impl Into<String>) -> RemoteFsResult<RemoteFsTransaction<'_>> {
        let transaction_id = transaction_id.into();
        match self {
            RemoteFs::Plain(r) => Ok(RemoteFsTransaction::Plain(r.begin(transaction_id)?)),
            RemoteFs::Zfs(r) => Ok(RemoteFsTransaction::Zfs(r.begin(transaction_id)?)),
        }
    }
}

/// An open transaction against a [`RemoteFs`], dispatched the same way.
pub enum RemoteFsTransaction<'a> {
    Plain(PlainRemoteTransaction<'a>),
    Zfs(ZfsRemoteTransaction<'a, ZfsCliCommands>),
}

impl<'a> RemoteFsTransaction<'a> {
    pub fn transaction_id(&self) -> &str {
        match self {
            RemoteFsTransaction::Plain(t) => t.transaction_id(),
            RemoteFsTransaction::Zfs(t) => t.transaction_id(),
        }
    }

    pub fn recv(&self, rel_path: &RepoPath, source: &Path) -> RemoteFsResult<()> {
        match self {
            RemoteFsTransaction::Plain(t) => t.recv(rel_path, source),
            RemoteFsTransaction::Zfs(t) => t.recv(rel_path, source),
        }
    }

    /// The live remote manifest outside this transaction's staging,
    /// for the coordinator's pre-commit `RemoteMovedUnderneath` check.
    pub fn live_manifest(&self) -> RemoteFsResult<Manifest> {
        match self {
            RemoteFsTransaction::Plain(t) => t.live_manifest(),
            RemoteFsTransaction::Zfs(t) => t.live_manifest(),
        }
    }

    pub fn delete(&mut self, rel_path: &RepoPath) -> RemoteFsResult<()> {
        match self {
            RemoteFsTransaction::Plain(t) => t.delete(rel_path),
            RemoteFsTransaction::Zfs(t) => {
                t.delete(rel_path.clone());
                Ok(())
            }
        }
    }

    pub fn put_manifest(&mut self, manifest: &Manifest) -> RemoteFsResult<()> {
        match self {
            RemoteFsTransaction::Plain(t) => t.put_manifest(manifest),
            RemoteFsTransaction::Zfs(t) => {
                t.put_manifest(manifest.clone());
                Ok(())
            }
        }
    }

    /// Commits the transaction. `transaction_id`/`next_snapshot_id` are
    /// only meaningful for a `Zfs` backend, which names its datasets
    /// and snapshot tags from them; a `Plain` backend ignores them and
    /// always returns `Ok(None)`.
    pub fn commit(self, transaction_id: &str, next_snapshot_id: &str) -> RemoteFsResult<Option<String>> {
        match self {
            RemoteFsTransaction::Plain(t) => {
                t.commit()?;
                Ok(None)
            }
            RemoteFsTransaction::Zfs(t) => Ok(Some(t.commit(transaction_id, next_snapshot_id)?)),
        }
    }

    pub fn rollback(self) -> RemoteFsResult<()> {
        match self {
            RemoteFsTransaction::Plain(t) => t.rollback(),
            RemoteFsTransaction::Zfs(t) => t.rollback(),
        }
    }
}

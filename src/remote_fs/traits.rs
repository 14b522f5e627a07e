//! Capability interfaces a remote filesystem backend may implement.
//!
//! Not every backend supports every capability: `filesystem_xfs` and
//! `content_addressed_p2p` repositories back onto
//! `PlainRemoteFilesystem`, which has no copy-on-write primitive and so
//! does not implement `SnapshotCapable`. `snapshot_zfs` repositories
//! back onto `ZfsRemoteFilesystem`, which does.

use super::errors::RemoteFsResult;

/// A backend that can enumerate the snapshot ids it has committed,
/// independent of the chronological record kept in
/// `sync-messages.json`.
pub trait SnapshotCapable {
    fn list_snapshots(&self) -> RemoteFsResult<Vec<String>>;
}

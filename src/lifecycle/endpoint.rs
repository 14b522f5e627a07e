//! Derives the remote filesystem and transport for a repository
//! configuration, per the external interfaces section: transport is
//! derived from repository kind and host equality to the local host,
//! never auto-detected.

use std::path::PathBuf;

use crate::config::RepositoryConfig;
use crate::errors::DsgResult;
use crate::remote_fs::{PlainRemoteFilesystem, RemoteFs, ZfsRemoteFilesystem};
use crate::repo_layout;
use crate::transport::{LocalTransport, TransportError};
use crate::zfs_driver::ZfsCliCommands;
use std::path::Path;

/// Build the remote filesystem and a same-host transport for
/// `config`, scoped to `transaction_id`'s scratch directory.
///
/// Only same-host repositories are reachable: a networked transport
/// for `snapshot_zfs`/`filesystem_xfs` on a remote host, and any
/// transport at all for `content_addressed_p2p`/`cloud_relay`, is an
/// external collaborator's responsibility this crate does not
/// implement (see the Non-goals).
pub fn build(
    config: &RepositoryConfig,
    local_root: &Path,
    local_host: &str,
    transaction_id: &str,
) -> DsgResult<(RemoteFs, LocalTransport)> {
    if !config.is_local(local_host) {
        return Err(TransportError::unsupported(
            "only same-host repositories are reachable by this engine; networked transport \
             is an external collaborator's responsibility",
        )
        .into());
    }

    let remote = match config {
        RepositoryConfig::SnapshotZfs(spec) => RemoteFs::Zfs(ZfsRemoteFilesystem::new(
            ZfsCliCommands::default(),
            spec.pool.clone(),
            PathBuf::from(&spec.mountpoint),
        )),
        RepositoryConfig::FilesystemXfs(spec) => {
            RemoteFs::Plain(PlainRemoteFilesystem::new(PathBuf::from(&spec.mountpoint)))
        }
        RepositoryConfig::ContentAddressedP2p(_) | RepositoryConfig::CloudRelay(_) => {
            return Err(TransportError::unsupported(
                "content_addressed_p2p and cloud_relay backends require a transport this \
                 crate does not implement",
            )
            .into());
        }
    };

    let scratch = repo_layout::staging_root(local_root).join(format!("xfer-{}", transaction_id));
    Ok((remote, LocalTransport::new(scratch)))
}

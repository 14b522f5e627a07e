//! The typed repository spec the engine consumes. Produced by an
//! external config loader (TOML/JSON parsing is out of scope here);
//! this module only defines the shape and the host-equality rule that
//! derives transport from repository kind, per the external
//! interfaces section of the specification — there is no
//! auto-detection of backend parameters in this crate.

use super::errors::{ConfigError, ConfigResult};

/// A `snapshot_zfs` repository: copy-on-write snapshots via
/// `zfs_driver`, reached through `remote_fs::ZfsRemoteFilesystem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotZfsSpec {
    pub host: String,
    pub pool: String,
    pub mountpoint: String,
}

/// A `filesystem_xfs` repository: a plain mounted or local directory
/// tree, reached through `remote_fs::PlainRemoteFilesystem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemXfsSpec {
    pub host: String,
    pub mountpoint: String,
}

/// A `content_addressed_p2p` repository: also backed by
/// `PlainRemoteFilesystem` in this crate (no peer discovery or content
/// routing — that belongs to an external transport collaborator); the
/// spec carries only the identifiers that collaborator would need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAddressedP2pSpec {
    pub id: String,
    pub encrypted: bool,
}

/// A `cloud_relay` repository: the remote object-store identifier and
/// path prefix. No cloud SDK ships in this crate, per the Non-goals;
/// the spec only identifies where a transport collaborator would
/// connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudRelaySpec {
    pub remote: String,
    pub path: String,
}

/// The four backend kinds a repository may be configured as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryConfig {
    SnapshotZfs(SnapshotZfsSpec),
    FilesystemXfs(FilesystemXfsSpec),
    ContentAddressedP2p(ContentAddressedP2pSpec),
    CloudRelay(CloudRelaySpec),
}

impl RepositoryConfig {
    /// Reject a well-typed but incomplete spec before a transaction is
    /// opened against it (`ConfigInvalid`, per the error taxonomy).
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            RepositoryConfig::SnapshotZfs(s) => {
                require_non_empty(&s.host, "snapshot_zfs.host")?;
                require_non_empty(&s.pool, "snapshot_zfs.pool")?;
                require_non_empty(&s.mountpoint, "snapshot_zfs.mountpoint")?;
            }
            RepositoryConfig::FilesystemXfs(s) => {
                require_non_empty(&s.host, "filesystem_xfs.host")?;
                require_non_empty(&s.mountpoint, "filesystem_xfs.mountpoint")?;
            }
            RepositoryConfig::ContentAddressedP2p(s) => {
                require_non_empty(&s.id, "content_addressed_p2p.id")?;
            }
            RepositoryConfig::CloudRelay(s) => {
                require_non_empty(&s.remote, "cloud_relay.remote")?;
                require_non_empty(&s.path, "cloud_relay.path")?;
            }
        }
        Ok(())
    }

    /// Whether this repository's backend host is the local host,
    /// i.e. whether `LocalTransport` applies. `content_addressed_p2p`
    /// and `cloud_relay` repositories have no single host field — they
    /// are never local by this definition, since their transport is
    /// an external collaborator's responsibility (see the Non-goals).
    pub fn is_local(&self, local_host: &str) -> bool {
        match self {
            RepositoryConfig::SnapshotZfs(s) => s.host == local_host,
            RepositoryConfig::FilesystemXfs(s) => s.host == local_host,
            RepositoryConfig::ContentAddressedP2p(_) => false,
            RepositoryConfig::CloudRelay(_) => false,
        }
    }

    /// Whether this repository kind backs onto a copy-on-write,
    /// `SnapshotCapable` remote filesystem.
    pub fn is_snapshot_capable(&self) -> bool {
        matches!(self, RepositoryConfig::SnapshotZfs(_))
    }
}

fn require_non_empty(value: &str, field: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_zfs_rejects_empty_pool() {
        let spec = RepositoryConfig::SnapshotZfs(SnapshotZfsSpec {
            host: "localhost".into(),
            pool: String::new(),
            mountpoint: "/mnt/repo".into(),
        });
        assert!(spec.validate().is_err());
    }

    #[test]
    fn filesystem_xfs_is_local_when_host_matches() {
        let spec = RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
            host: "build-01".into(),
            mountpoint: "/srv/repo".into(),
        });
        assert!(spec.is_local("build-01"));
        assert!(!spec.is_local("build-02"));
    }

    #[test]
    fn only_snapshot_zfs_is_snapshot_capable() {
        let zfs = RepositoryConfig::SnapshotZfs(SnapshotZfsSpec {
            host: "h".into(),
            pool: "tank".into(),
            mountpoint: "/mnt".into(),
        });
        let xfs = RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
            host: "h".into(),
            mountpoint: "/mnt".into(),
        });
        assert!(zfs.is_snapshot_capable());
        assert!(!xfs.is_snapshot_capable());
    }
}

//! The on-disk repository layout, bit-exact for compatibility:
//!
//! ```text
//! <root>/                          # working tree
//! <root>/<meta>/                   # reserved metadata directory
//!   last-sync.json                 # the current cache manifest (C)
//!   sync-messages.json             # append-only chronological sync metadata
//!   archive/<sid>-sync.json.lz4    # compressed predecessor manifests
//!   staging/<tx>/                  # transaction-scoped; absent between syncs
//!   lock                           # local advisory lock file
//!   needs-recovery                 # present iff a prior client commit retry was exhausted
//! ```

use std::path::{Path, PathBuf};

/// The reserved metadata directory name.
pub const META_DIR_NAME: &str = ".dsg";

/// `<root>/<meta>`.
pub fn meta_dir(root: &Path) -> PathBuf {
    root.join(META_DIR_NAME)
}

/// `<root>/<meta>/last-sync.json`.
pub fn last_sync_path(root: &Path) -> PathBuf {
    meta_dir(root).join("last-sync.json")
}

/// `<root>/<meta>/sync-messages.json`.
pub fn sync_messages_path(root: &Path) -> PathBuf {
    meta_dir(root).join("sync-messages.json")
}

/// `<root>/<meta>/archive/`.
pub fn archive_dir(root: &Path) -> PathBuf {
    meta_dir(root).join("archive")
}

/// `<root>/<meta>/archive/<sid>-sync.json.lz4`.
pub fn archive_entry_path(root: &Path, snapshot_id: &str) -> PathBuf {
    archive_dir(root).join(format!("{}-sync.json.lz4", snapshot_id))
}

/// `<root>/<meta>/staging/`.
pub fn staging_root(root: &Path) -> PathBuf {
    meta_dir(root).join("staging")
}

/// `<root>/<meta>/staging/<tx>/`.
pub fn staging_dir(root: &Path, transaction_id: &str) -> PathBuf {
    staging_root(root).join(transaction_id)
}

/// `<root>/<meta>/staging/<tx>/.deletions/`.
pub fn deletions_dir(root: &Path, transaction_id: &str) -> PathBuf {
    staging_dir(root, transaction_id).join(".deletions")
}

/// `<root>/<meta>/lock`.
pub fn lock_path(root: &Path) -> PathBuf {
    meta_dir(root).join("lock")
}

/// `<root>/<meta>/needs-recovery`.
pub fn needs_recovery_path(root: &Path) -> PathBuf {
    meta_dir(root).join("needs-recovery")
}

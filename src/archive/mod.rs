//! LZ4-framed archival of predecessor manifests.
//!
//! When a snapshot is superseded, its manifest is compressed and moved
//! under `<meta>/archive/<sid>-sync.json.lz4` rather than discarded —
//! the full snapshot-hash chain must remain inspectable (`blame`/`log`)
//! even though only the current manifest stays uncompressed as the
//! live cache.

mod errors;

pub use errors::{ArchiveError, ArchiveResult};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::manifest::Manifest;
use crate::repo_layout;

/// Compress `manifest` and write it to `<root>/<meta>/archive/<sid>-sync.json.lz4`.
pub fn write_compressed(root: &Path, snapshot_id: &str, manifest: &Manifest) -> ArchiveResult<()> {
    let json = manifest
        .to_json_string(true)
        .map_err(|e| ArchiveError::encode(e.to_string()))?;
    let compressed = lz4_flex::compress_prepend_size(json.as_bytes());

    let dir = repo_layout::archive_dir(root);
    fs::create_dir_all(&dir)?;

    let path = repo_layout::archive_entry_path(root, snapshot_id);
    let mut file = File::create(&path)?;
    file.write_all(&compressed)?;
    file.sync_all()?;

    Ok(())
}

/// Read and decompress the archived manifest for `snapshot_id`.
pub fn read_compressed(root: &Path, snapshot_id: &str) -> ArchiveResult<Manifest> {
    let path = repo_layout::archive_entry_path(root, snapshot_id);
    let compressed = fs::read(&path)?;
    let json = lz4_flex::decompress_size_prepended(&compressed)
        .map_err(|e| ArchiveError::decode(format!("corrupt lz4 frame for {}: {}", snapshot_id, e)))?;
    Manifest::from_json_str(
        std::str::from_utf8(&json).map_err(|e| ArchiveError::decode(e.to_string()))?,
    )
    .map_err(|e| ArchiveError::decode(e.to_string()))
}

/// Whether `snapshot_id` has already been archived under `root`.
pub fn is_archived(root: &Path, snapshot_id: &str) -> bool {
    repo_layout::archive_entry_path(root, snapshot_id).exists()
}

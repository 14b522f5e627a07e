//! `ManifestMetadata`: the descriptor carried by every manifest and
//! every entry of `sync-messages.json`.

use serde::{Deserialize, Serialize};

/// Manifest format version this crate writes and expects to read.
pub const MANIFEST_VERSION: u32 = 1;

/// Metadata describing a single snapshot, embedded both in
/// `last-sync.json` (as the current cache's metadata) and in
/// `sync-messages.json` (one entry per known snapshot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestMetadata {
    pub manifest_version: u32,
    /// `s{n}`, monotonically increasing.
    pub snapshot_id: String,
    /// RFC3339 timestamp at the project's fixed timezone offset.
    pub created_at: String,
    /// User id that performed the sync producing this snapshot.
    pub created_by: String,
    pub entry_count: usize,
    /// Order-independent hash of all entries.
    pub entries_hash: String,
    /// Predecessor snapshot id, or `None` for `s1`.
    pub snapshot_previous: Option<String>,
    /// `xxh3_64(entries_hash || snapshot_message || previous_snapshot_hash_or_empty)`.
    pub snapshot_hash: String,
    pub snapshot_message: String,
    pub snapshot_notes: String,
}

impl ManifestMetadata {
    /// The integer `n` in this snapshot's `s{n}` id.
    ///
    /// Returns `None` if the id doesn't match the `s{n}` shape; that
    /// is a `ManifestCorrupt` condition for any caller that encounters
    /// it on disk.
    pub fn sequence_number(&self) -> Option<u64> {
        parse_snapshot_sequence(&self.snapshot_id)
    }
}

/// Parse the integer `n` out of a `s{n}`-shaped snapshot id.
pub fn parse_snapshot_sequence(snapshot_id: &str) -> Option<u64> {
    snapshot_id.strip_prefix('s')?.parse().ok()
}

/// Format the `n`th snapshot id.
pub fn format_snapshot_id(n: u64) -> String {
    format!("s{}", n)
}

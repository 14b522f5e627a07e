//! Durable commit marker
//!
//! Mirrors the fsync-then-rename durability pattern used for authority
//! transition markers elsewhere in this codebase: write to a temp
//! file, fsync it, rename atomically into place, fsync the containing
//! directory. Presence of the marker at the next `begin()` means a
//! previous commit was interrupted after the point of no return; the
//! recorded moves are re-applied (each one is idempotent: moving an
//! already-moved file is a no-op checked by existence) rather than
//! rolled back.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{ClientFsError, ClientFsResult};

const MARKER_FILE_NAME: &str = "commit.marker";

/// The set of moves and deletions a commit intends to apply, recorded
/// durably before any of them are performed so a crash mid-commit can
/// resume rather than leave an ambiguous tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitMarker {
    pub transaction_id: String,
    /// `(staged_relative_path, final_relative_path)` pairs.
    pub moves: Vec<(String, String)>,
    /// Relative paths to remove from the working tree.
    pub deletions: Vec<String>,
}

pub struct CommitMarkerFile {
    marker_path: PathBuf,
    temp_path: PathBuf,
}

impl CommitMarkerFile {
    pub fn new(staging_dir: &Path) -> Self {
        Self {
            marker_path: staging_dir.join(MARKER_FILE_NAME),
            temp_path: staging_dir.join(format!("{}.tmp", MARKER_FILE_NAME)),
        }
    }

    pub fn write_atomic(&self, marker: &CommitMarker) -> ClientFsResult<()> {
        if let Some(parent) = self.marker_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(marker)
            .map_err(|e| ClientFsError::marker_corrupt(format!("failed to serialize commit marker: {}", e)))?;

        let mut file = File::create(&self.temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        fs::rename(&self.temp_path, &self.marker_path)?;

        if let Some(parent) = self.marker_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    pub fn read(&self) -> ClientFsResult<Option<CommitMarker>> {
        if !self.marker_path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.marker_path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let marker: CommitMarker = serde_json::from_str(&content)
            .map_err(|e| ClientFsError::marker_corrupt(format!("failed to parse commit marker: {}", e)))?;
        Ok(Some(marker))
    }

    pub fn exists(&self) -> bool {
        self.marker_path.exists()
    }

    pub fn remove(&self) -> ClientFsResult<()> {
        if self.marker_path.exists() {
            fs::remove_file(&self.marker_path)?;
        }
        if self.temp_path.exists() {
            let _ = fs::remove_file(&self.temp_path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn marker_round_trips() {
        let tmp = TempDir::new().unwrap();
        let marker_file = CommitMarkerFile::new(tmp.path());
        let marker = CommitMarker {
            transaction_id: "tx-1".to_string(),
            moves: vec![("staged/a.txt".to_string(), "a.txt".to_string())],
            deletions: vec!["old.txt".to_string()],
        };

        marker_file.write_atomic(&marker).unwrap();
        assert!(marker_file.exists());
        assert_eq!(marker_file.read().unwrap(), Some(marker));

        marker_file.remove().unwrap();
        assert!(!marker_file.exists());
        assert_eq!(marker_file.read().unwrap(), None);
    }

    #[test]
    fn absent_marker_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let marker_file = CommitMarkerFile::new(tmp.path());
        assert_eq!(marker_file.read().unwrap(), None);
    }
}

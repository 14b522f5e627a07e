//! Crash point injection for testing durability
//!
//! Per the atomicity testable property, the test suite must be able to
//! inject a failure at any single point between `begin` and `commit`
//! and observe that the working tree and remote head are never left in
//! a mixed state. This module provides that injection via the
//! `DSG_CRASH_POINT` environment variable.
//!
//! When a crash point is enabled, dsg immediately terminates via
//! `std::process::abort()` - no cleanup, no unwinding, no catching.
//!
//! # Usage
//!
//! ```ignore
//! use dsg::crash_point::maybe_crash;
//!
//! maybe_crash("coordinator_after_remote_commit");
//! ```
//!
//! # Testing
//!
//! ```bash
//! DSG_CRASH_POINT=coordinator_after_remote_commit cargo test
//! ```

use std::sync::OnceLock;

/// Cache the crash point name to avoid repeated env var lookups
static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

/// Get the configured crash point (cached)
#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("DSG_CRASH_POINT").ok())
        .as_deref()
}

/// Check if a specific crash point is enabled
///
/// Returns true if `DSG_CRASH_POINT` equals the given name.
/// Zero-cost when disabled (env var not set).
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Trigger a crash if the named crash point is enabled.
///
/// Terminates immediately via `std::process::abort()`: no cleanup, no
/// unwinding, no catching. A no-op when `DSG_CRASH_POINT` is unset or
/// doesn't match `name`.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names, covering the transaction lifecycle
/// from `begin()` through `commit()`/`rollback()`.
pub mod points {
    // Client filesystem staging
    pub const CLIENT_FS_AFTER_STAGE_FILE: &str = "client_fs_after_stage_file";
    pub const CLIENT_FS_BEFORE_COMMIT_MARKER: &str = "client_fs_before_commit_marker";
    pub const CLIENT_FS_AFTER_COMMIT_MARKER: &str = "client_fs_after_commit_marker";
    pub const CLIENT_FS_AFTER_MOVE_ONE_FILE: &str = "client_fs_after_move_one_file";
    pub const CLIENT_FS_AFTER_APPLY_DELETIONS: &str = "client_fs_after_apply_deletions";

    // Remote filesystem staging (plain backend)
    pub const REMOTE_FS_AFTER_STAGE_FILE: &str = "remote_fs_after_stage_file";
    pub const REMOTE_FS_BEFORE_MANIFEST_WRITE: &str = "remote_fs_before_manifest_write";
    pub const REMOTE_FS_BEFORE_COMMIT_MARKER: &str = "remote_fs_before_commit_marker";
    pub const REMOTE_FS_AFTER_COMMIT_MARKER: &str = "remote_fs_after_commit_marker";
    pub const REMOTE_FS_AFTER_MOVE_ONE_FILE: &str = "remote_fs_after_move_one_file";
    pub const REMOTE_FS_AFTER_APPLY_DELETIONS: &str = "remote_fs_after_apply_deletions";

    // Snapshot-capable backend driver (zfs_driver)
    pub const BACKEND_AFTER_TEMP_DATASET_CREATE: &str = "backend_after_temp_dataset_create";
    pub const BACKEND_AFTER_BASELINE_SNAPSHOT: &str = "backend_after_baseline_snapshot";
    pub const BACKEND_AFTER_CLONE_CREATE: &str = "backend_after_clone_create";
    pub const BACKEND_BEFORE_PROMOTE: &str = "backend_before_promote";
    pub const BACKEND_AFTER_PROMOTE: &str = "backend_after_promote";
    pub const BACKEND_AFTER_RENAME: &str = "backend_after_rename";
    pub const BACKEND_BEFORE_SNAPSHOT_TAG: &str = "backend_before_snapshot_tag";
    pub const BACKEND_AFTER_SNAPSHOT_TAG: &str = "backend_after_snapshot_tag";

    // Transaction coordinator
    pub const COORDINATOR_AFTER_PRECOMMIT_VALIDATE: &str = "coordinator_after_precommit_validate";
    pub const COORDINATOR_AFTER_REMOTE_COMMIT: &str = "coordinator_after_remote_commit";
    pub const COORDINATOR_BEFORE_CLIENT_COMMIT: &str = "coordinator_before_client_commit";
    pub const COORDINATOR_AFTER_CLIENT_COMMIT: &str = "coordinator_after_client_commit";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            CLIENT_FS_AFTER_STAGE_FILE,
            CLIENT_FS_BEFORE_COMMIT_MARKER,
            CLIENT_FS_AFTER_COMMIT_MARKER,
            CLIENT_FS_AFTER_MOVE_ONE_FILE,
            CLIENT_FS_AFTER_APPLY_DELETIONS,
            REMOTE_FS_AFTER_STAGE_FILE,
            REMOTE_FS_BEFORE_MANIFEST_WRITE,
            REMOTE_FS_BEFORE_COMMIT_MARKER,
            REMOTE_FS_AFTER_COMMIT_MARKER,
            REMOTE_FS_AFTER_MOVE_ONE_FILE,
            REMOTE_FS_AFTER_APPLY_DELETIONS,
            BACKEND_AFTER_TEMP_DATASET_CREATE,
            BACKEND_AFTER_BASELINE_SNAPSHOT,
            BACKEND_AFTER_CLONE_CREATE,
            BACKEND_BEFORE_PROMOTE,
            BACKEND_AFTER_PROMOTE,
            BACKEND_AFTER_RENAME,
            BACKEND_BEFORE_SNAPSHOT_TAG,
            BACKEND_AFTER_SNAPSHOT_TAG,
            COORDINATOR_AFTER_PRECOMMIT_VALIDATE,
            COORDINATOR_AFTER_REMOTE_COMMIT,
            COORDINATOR_BEFORE_CLIENT_COMMIT,
            COORDINATOR_AFTER_CLIENT_COMMIT,
        ]
    }
}

//! The primitive operations a snapshot-capable backend must support.
//!
//! Abstracted behind a trait so the driver's orchestration logic
//! (`BackendDriver`) can be exercised in tests against an in-memory
//! fake instead of a real `zfs` pool.

use std::path::Path;
use std::process::Command;

use super::errors::{BackendError, BackendResult};

pub trait ZfsCommands {
    fn dataset_exists(&self, name: &str) -> bool;
    fn create_dataset(&self, name: &str, mountpoint: &Path) -> BackendResult<()>;
    fn rename_dataset(&self, from: &str, to: &str) -> BackendResult<()>;
    fn destroy_dataset(&self, name: &str) -> BackendResult<()>;
    fn set_mountpoint(&self, name: &str, mountpoint: &Path) -> BackendResult<()>;
    fn snapshot(&self, dataset: &str, snapshot_name: &str) -> BackendResult<()>;
    fn clone_from_snapshot(
        &self,
        source_snapshot: &str,
        clone_name: &str,
        mountpoint: &Path,
    ) -> BackendResult<()>;
    fn promote(&self, clone_name: &str) -> BackendResult<()>;
}

/// Shells out to the real `zfs` command-line tool.
pub struct ZfsCliCommands {
    pub zfs_binary: String,
}

impl Default for ZfsCliCommands {
    fn default() -> Self {
        Self { zfs_binary: "zfs".to_string() }
    }
}

impl ZfsCliCommands {
    fn run(&self, args: &[&str]) -> BackendResult<()> {
        let output = Command::new(&self.zfs_binary)
            .args(args)
            .output()
            .map_err(|e| BackendError::command_failed(format!("failed to spawn zfs: {}", e)))?;
        if !output.status.success() {
            return Err(BackendError::command_failed(format!(
                "zfs {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

impl ZfsCommands for ZfsCliCommands {
    fn dataset_exists(&self, name: &str) -> bool {
        Command::new(&self.zfs_binary)
            .args(["list", "-H", name])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn create_dataset(&self, name: &str, mountpoint: &Path) -> BackendResult<()> {
        self.run(&["create", "-o", &format!("mountpoint={}", mountpoint.display()), name])
    }

    fn rename_dataset(&self, from: &str, to: &str) -> BackendResult<()> {
        self.run(&["rename", from, to])
    }

    fn destroy_dataset(&self, name: &str) -> BackendResult<()> {
        self.run(&["destroy", "-r", name])
    }

    fn set_mountpoint(&self, name: &str, mountpoint: &Path) -> BackendResult<()> {
        self.run(&["set", &format!("mountpoint={}", mountpoint.display()), name])
    }

    fn snapshot(&self, dataset: &str, snapshot_name: &str) -> BackendResult<()> {
        self.run(&["snapshot", &format!("{}@{}", dataset, snapshot_name)])
    }

    fn clone_from_snapshot(&self, source_snapshot: &str, clone_name: &str, mountpoint: &Path) -> BackendResult<()> {
        self.run(&[
            "clone",
            "-o",
            &format!("mountpoint={}", mountpoint.display()),
            source_snapshot,
            clone_name,
        ])
    }

    fn promote(&self, clone_name: &str) -> BackendResult<()> {
        self.run(&["promote", clone_name])
    }
}

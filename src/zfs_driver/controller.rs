//! Orchestrates the init and sync snapshot patterns over a
//! `ZfsCommands` backend, driving `BackendState` through its
//! transitions and injecting crash points at the same places a real
//! outage could land.

use std::path::{Path, PathBuf};

use crate::crash_point::{maybe_crash, points};

use super::commands::ZfsCommands;
use super::errors::{BackendError, BackendResult};
use super::state::BackendState;

pub struct BackendDriver<C: ZfsCommands> {
    commands: C,
    state: BackendState,
}

impl<C: ZfsCommands> BackendDriver<C> {
    pub fn new(commands: C) -> Self {
        Self { commands, state: BackendState::Idle }
    }

    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Init pattern: the target dataset does not exist yet.
    ///
    /// `stage` populates the temporary dataset's mountpoint with the
    /// transaction's files; if it returns an error the temp dataset is
    /// destroyed and the driver stays at `Idle`.
    pub fn run_init(
        &mut self,
        dataset: &str,
        final_mountpoint: &Path,
        temp_mountpoint: &Path,
        transaction_id: &str,
        stage: impl FnOnce(&Path) -> BackendResult<()>,
    ) -> BackendResult<String> {
        let temp_name = format!("{}-init-{}", dataset, transaction_id);

        self.commands.create_dataset(&temp_name, temp_mountpoint)?;
        self.state = std::mem::replace(&mut self.state, BackendState::Idle).init_create_temp(&temp_name)?;
        maybe_crash(points::BACKEND_AFTER_TEMP_DATASET_CREATE);

        if let Err(err) = stage(temp_mountpoint) {
            let _ = self.commands.destroy_dataset(&temp_name);
            self.state = BackendState::Idle;
            return Err(err);
        }

        self.commands.rename_dataset(&temp_name, dataset)?;
        self.commands.set_mountpoint(dataset, final_mountpoint)?;
        self.state = std::mem::replace(&mut self.state, BackendState::Idle).init_promote(dataset)?;
        maybe_crash(points::BACKEND_AFTER_RENAME);

        maybe_crash(points::BACKEND_BEFORE_SNAPSHOT_TAG);
        self.commands.snapshot(dataset, "s1")?;
        maybe_crash(points::BACKEND_AFTER_SNAPSHOT_TAG);

        self.state = std::mem::replace(&mut self.state, BackendState::Idle).init_commit("s1")?;
        Ok("s1".to_string())
    }

    /// Sync pattern: the target dataset already exists.
    ///
    /// Returns the new snapshot id and, if best-effort destruction of
    /// the displaced old dataset failed, its name for deferred
    /// cleanup by a maintenance command.
    pub fn run_sync(
        &mut self,
        dataset: &str,
        clone_mountpoint: &Path,
        transaction_id: &str,
        next_snapshot_id: &str,
        stage: impl FnOnce(&Path) -> BackendResult<()>,
    ) -> BackendResult<(String, Option<String>)> {
        let baseline = format!("sync-baseline-{}", transaction_id);
        let clone_name = format!("{}-clone-{}", dataset, transaction_id);

        self.commands.snapshot(dataset, &baseline)?;
        self.state =
            std::mem::replace(&mut self.state, BackendState::Idle).sync_take_baseline(dataset, &baseline)?;
        maybe_crash(points::BACKEND_AFTER_BASELINE_SNAPSHOT);

        let source_snapshot = format!("{}@{}", dataset, baseline);
        if let Err(err) = self.commands.clone_from_snapshot(&source_snapshot, &clone_name, clone_mountpoint) {
            let _ = self.commands.destroy_dataset(&format!("{}@{}", dataset, baseline));
            self.state = BackendState::Idle;
            return Err(err);
        }
        self.state = std::mem::replace(&mut self.state, BackendState::Idle).sync_create_clone(&clone_name)?;
        maybe_crash(points::BACKEND_AFTER_CLONE_CREATE);

        if let Err(err) = stage(clone_mountpoint) {
            let _ = self.commands.destroy_dataset(&clone_name);
            let _ = self.commands.destroy_dataset(&format!("{}@{}", dataset, baseline));
            self.state = BackendState::Idle;
            return Err(err);
        }

        maybe_crash(points::BACKEND_BEFORE_PROMOTE);
        self.commands.promote(&clone_name)?;
        maybe_crash(points::BACKEND_AFTER_PROMOTE);

        let displaced = format!("{}-displaced-{}", dataset, transaction_id);
        self.commands.rename_dataset(dataset, &displaced)?;
        self.commands.rename_dataset(&clone_name, dataset)?;
        self.commands.set_mountpoint(dataset, clone_mountpoint)?;
        self.state = std::mem::replace(&mut self.state, BackendState::Idle).sync_promote()?;
        maybe_crash(points::BACKEND_AFTER_RENAME);

        maybe_crash(points::BACKEND_BEFORE_SNAPSHOT_TAG);
        self.commands.snapshot(dataset, next_snapshot_id)?;
        maybe_crash(points::BACKEND_AFTER_SNAPSHOT_TAG);

        let cleanup_pending = match self.commands.destroy_dataset(&displaced) {
            Ok(()) => None,
            Err(_) => Some(displaced.clone()),
        };

        self.state = std::mem::replace(&mut self.state, BackendState::Idle)
            .sync_commit(next_snapshot_id, cleanup_pending.clone())?;

        Ok((next_snapshot_id.to_string(), cleanup_pending))
    }

    pub fn dataset_exists(&self, dataset: &str) -> bool {
        self.commands.dataset_exists(dataset)
    }
}

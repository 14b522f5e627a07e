//! Backend driver state machine
//!
//! States are explicit and enumerable; transitions are event-driven,
//! never inferred from external polling, and deterministic. Only
//! `Promoting`/`Committed` (for the sync pattern) and `TempCreated`
//! past the commit point (for the init pattern) have a durable effect
//! on the remote backend — every other state is forgotten on crash,
//! since nothing it represents is visible outside this transaction.

use super::errors::{BackendError, BackendResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    /// No operation in progress.
    Idle,

    // --- Init pattern: dataset absent ---
    /// A temporary dataset has been created at a temp mountpoint.
    InitTempCreated { temp_name: String },
    /// The temp dataset has been renamed into its final name and
    /// mounted; the new snapshot has not yet been taken.
    InitPromoted { dataset: String },
    /// `s1` has been taken on the final dataset. Terminal success.
    InitCommitted { dataset: String, snapshot_id: String },

    // --- Sync pattern: dataset present ---
    /// A baseline snapshot of the live dataset has been taken.
    SyncBaselineTaken { dataset: String, baseline: String },
    /// A clone of the baseline has been created at a temp mountpoint.
    SyncCloneCreated { dataset: String, baseline: String, clone: String },
    /// The clone has been promoted; the old dataset has been renamed
    /// aside and the clone renamed into the canonical name. The new
    /// snapshot has not yet been taken.
    SyncPromoted { dataset: String, displaced: String },
    /// `s{k+1}` has been taken on the promoted dataset. Terminal
    /// success; `cleanup_pending` is `Some` when best-effort
    /// destruction of the displaced dataset failed.
    SyncCommitted { dataset: String, snapshot_id: String, cleanup_pending: Option<String> },
}

impl Default for BackendState {
    fn default() -> Self {
        Self::Idle
    }
}

impl BackendState {
    pub fn state_name(&self) -> &'static str {
        match self {
            BackendState::Idle => "Idle",
            BackendState::InitTempCreated { .. } => "InitTempCreated",
            BackendState::InitPromoted { .. } => "InitPromoted",
            BackendState::InitCommitted { .. } => "InitCommitted",
            BackendState::SyncBaselineTaken { .. } => "SyncBaselineTaken",
            BackendState::SyncCloneCreated { .. } => "SyncCloneCreated",
            BackendState::SyncPromoted { .. } => "SyncPromoted",
            BackendState::SyncCommitted { .. } => "SyncCommitted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BackendState::InitCommitted { .. } | BackendState::SyncCommitted { .. } | BackendState::Idle)
    }

    // --- Init pattern transitions ---

    pub fn init_create_temp(self, temp_name: impl Into<String>) -> BackendResult<Self> {
        match self {
            BackendState::Idle => Ok(BackendState::InitTempCreated { temp_name: temp_name.into() }),
            other => Err(BackendError::forbidden_transition(other.state_name(), "InitTempCreated")),
        }
    }

    pub fn init_promote(self, dataset: impl Into<String>) -> BackendResult<Self> {
        match self {
            BackendState::InitTempCreated { .. } => Ok(BackendState::InitPromoted { dataset: dataset.into() }),
            other => Err(BackendError::forbidden_transition(other.state_name(), "InitPromoted")),
        }
    }

    pub fn init_commit(self, snapshot_id: impl Into<String>) -> BackendResult<Self> {
        match self {
            BackendState::InitPromoted { dataset } => {
                Ok(BackendState::InitCommitted { dataset, snapshot_id: snapshot_id.into() })
            }
            other => Err(BackendError::forbidden_transition(other.state_name(), "InitCommitted")),
        }
    }

    // --- Sync pattern transitions ---

    pub fn sync_take_baseline(self, dataset: impl Into<String>, baseline: impl Into<String>) -> BackendResult<Self> {
        match self {
            BackendState::Idle => Ok(BackendState::SyncBaselineTaken { dataset: dataset.into(), baseline: baseline.into() }),
            other => Err(BackendError::forbidden_transition(other.state_name(), "SyncBaselineTaken")),
        }
    }

    pub fn sync_create_clone(self, clone: impl Into<String>) -> BackendResult<Self> {
        match self {
            BackendState::SyncBaselineTaken { dataset, baseline } => {
                Ok(BackendState::SyncCloneCreated { dataset, baseline, clone: clone.into() })
            }
            other => Err(BackendError::forbidden_transition(other.state_name(), "SyncCloneCreated")),
        }
    }

    pub fn sync_promote(self) -> BackendResult<Self> {
        match self {
            BackendState::SyncCloneCreated { dataset, .. } => {
                Ok(BackendState::SyncPromoted { displaced: format!("{}-displaced", dataset), dataset })
            }
            other => Err(BackendError::forbidden_transition(other.state_name(), "SyncPromoted")),
        }
    }

    pub fn sync_commit(self, snapshot_id: impl Into<String>, cleanup_pending: Option<String>) -> BackendResult<Self> {
        match self {
            BackendState::SyncPromoted { dataset, .. } => {
                Ok(BackendState::SyncCommitted { dataset, snapshot_id: snapshot_id.into(), cleanup_pending })
            }
            other => Err(BackendError::forbidden_transition(other.state_name(), "SyncCommitted")),
        }
    }

    // --- Rollback (valid before the corresponding promote/commit) ---

    pub fn rollback(self) -> BackendResult<Self> {
        match self {
            BackendState::InitTempCreated { .. }
            | BackendState::SyncBaselineTaken { .. }
            | BackendState::SyncCloneCreated { .. } => Ok(BackendState::Idle),
            other => Err(BackendError::forbidden_transition(other.state_name(), "Idle")),
        }
    }
}

//! The unified engine: five entry points (`init`, `clone_repository`,
//! `sync`, `status`, `blame`, `log`) built on one scan/load/merge/plan
//! pipeline, shared between `core` (the transactional three) and
//! `query` (the three read-only ones).

mod core;
mod endpoint;
mod query;
mod results;

pub use core::{clone_repository, init, sync};
pub use query::{blame, log, status};
pub use results::{
    ChangeEvent, ChangeHistory, CloneResult, InitResult, SnapshotHistory, StatusResult, SyncOutcome,
    SyncResult,
};

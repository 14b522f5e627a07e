//! Snapshot-capable backend driver: automatic init/sync pattern
//! selection over a copy-on-write storage backend.

mod commands;
mod controller;
mod errors;
mod state;

pub use commands::{ZfsCliCommands, ZfsCommands};
pub use controller::BackendDriver;
pub use errors::{BackendError, BackendErrorKind, BackendResult};
pub use state::BackendState;

//! Typed repository configuration and the progress callback surface.
//!
//! This crate never reads configuration off disk — loading and
//! parsing (TOML/JSON) is an external collaborator's job. It only
//! defines the shape that loader produces and validates it before the
//! lifecycle opens a transaction against it.

mod errors;
mod progress;
mod repository;

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};
pub use progress::{NoopProgressSink, OperationLabel, OperationOutcome, OperationStep, ProgressSink};
pub use repository::{
    CloudRelaySpec, ContentAddressedP2pSpec, FilesystemXfsSpec, RepositoryConfig, SnapshotZfsSpec,
};

//! Manifest model: entries, metadata, canonical serialization, and the
//! snapshot-hash chain.
//!
//! This module is pure: no I/O beyond the reader/writer passed to
//! `Manifest::serialize`/`Manifest::deserialize`. Producing a manifest
//! from a live working tree is the scanner's job (`crate::scanner`);
//! this module only knows how to hold, hash, serialize, and compare
//! entries once they exist.

pub mod entry;
pub mod errors;
pub mod hash;
pub mod metadata;
pub mod model;
pub mod path;

pub use entry::{Entry, FileRef, LinkRef};
pub use errors::{ManifestError, ManifestResult};
pub use metadata::{format_snapshot_id, parse_snapshot_sequence, ManifestMetadata, MANIFEST_VERSION};
pub use model::Manifest;
pub use path::RepoPath;

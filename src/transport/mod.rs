//! Moves bytes between client and remote filesystems.
//!
//! For same-host operation this is a zero-copy file move
//! ([`LocalTransport`]); a networked transport is a reliable streaming
//! protocol with per-file temporary staging on the receiving host
//! ([`StreamingTransport`], an extension point for SSH/cloud-object
//! backends, which are out of scope for this crate — see
//! `TransportError::Unsupported`).

mod errors;
mod local;
mod stream;

pub use errors::{TransportError, TransportErrorCode, TransportResult};
pub use local::LocalTransport;
pub use stream::ContentStream;

use std::path::PathBuf;

/// An opaque staged-content handle returned by `send_to_remote`/
/// `send_to_local`. Single-use: `recv` on the receiving filesystem
/// consumes it, and `cleanup()` removes whatever the transport staged
/// if the transaction is abandoned before that.
pub struct TempHandle {
    pub(crate) path: PathBuf,
    consumed: bool,
}

impl TempHandle {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, consumed: false }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub(crate) fn mark_consumed(&mut self) {
        self.consumed = true;
    }

    /// Removes the staged temp file if it was never consumed by a
    /// `recv` call. A no-op otherwise, since `recv` already moved it
    /// into place.
    pub fn cleanup(mut self) -> TransportResult<()> {
        if !self.consumed && self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        self.mark_consumed();
        Ok(())
    }
}

/// Binds connection-level resources and moves byte streams between the
/// client and remote sides of a transaction.
pub trait Transport {
    fn open_session(&mut self) -> TransportResult<()>;
    fn close_session(&mut self) -> TransportResult<()>;

    /// Stage `stream`'s bytes on the remote side; returns a handle the
    /// remote filesystem consumes with `recv`.
    fn send_to_remote(&mut self, stream: ContentStream) -> TransportResult<TempHandle>;

    /// Symmetric: stage bytes on the client side.
    fn send_to_local(&mut self, stream: ContentStream) -> TransportResult<TempHandle>;
}

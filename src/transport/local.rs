//! Same-host transport: a zero-copy file move, for when the client
//! working tree and the remote repository are both reachable from this
//! process (a mounted `filesystem_xfs`/`snapshot_zfs` remote, or a
//! local-disk `content_addressed_p2p` cache).

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::errors::TransportResult;
use super::{ContentStream, TempHandle, Transport};

pub struct LocalTransport {
    scratch_dir: PathBuf,
    session_open: bool,
    next_id: u64,
}

impl LocalTransport {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self { scratch_dir: scratch_dir.into(), session_open: false, next_id: 0 }
    }

    /// Stages `stream`'s content at a fresh path under `scratch_dir`.
    /// When `stream` carries the path it was opened from and that path
    /// shares a filesystem with `scratch_dir`, this is a zero-copy
    /// `fs::rename`; otherwise it falls back to a buffered copy.
    fn stage(&mut self, mut stream: ContentStream) -> TransportResult<TempHandle> {
        fs::create_dir_all(&self.scratch_dir)?;
        self.next_id += 1;
        let path = self.scratch_dir.join(format!("xfer-{}", self.next_id));

        if let Some(source) = stream.source_path() {
            if same_filesystem(source, &self.scratch_dir)? {
                fs::rename(source, &path)?;
                return Ok(TempHandle::new(path));
            }
        }

        use std::io::Write;
        let mut out = fs::File::create(&path)?;
        while let Some(chunk) = stream.read(64 * 1024)? {
            out.write_all(&chunk)?;
        }
        Ok(TempHandle::new(path))
    }
}

/// Whether `a` and `b` live on the same filesystem, per device id.
fn same_filesystem(a: &Path, b: &Path) -> TransportResult<bool> {
    let a_dev = fs::metadata(a)?.dev();
    let b_dev = fs::metadata(b)?.dev();
    Ok(a_dev == b_dev)
}

impl Transport for LocalTransport {
    fn open_session(&mut self) -> TransportResult<()> {
        fs::create_dir_all(&self.scratch_dir)?;
        self.session_open = true;
        Ok(())
    }

    fn close_session(&mut self) -> TransportResult<()> {
        self.session_open = false;
        if self.scratch_dir.exists() {
            let _ = fs::remove_dir_all(&self.scratch_dir);
        }
        Ok(())
    }

    fn send_to_remote(&mut self, stream: ContentStream) -> TransportResult<TempHandle> {
        self.require_open()?;
        self.stage(stream)
    }

    fn send_to_local(&mut self, stream: ContentStream) -> TransportResult<TempHandle> {
        self.require_open()?;
        self.stage(stream)
    }
}

impl LocalTransport {
    fn require_open(&self) -> TransportResult<()> {
        if !self.session_open {
            return Err(super::errors::TransportError::session_not_open(
                "send attempted before open_session()",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stages_stream_bytes_into_scratch_dir() {
        let scratch = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let source_file = source.path().join("a.txt");
        fs::write(&source_file, b"hello world").unwrap();

        let mut transport = LocalTransport::new(scratch.path().join("xfer"));
        transport.open_session().unwrap();

        let stream = ContentStream::open(&source_file).unwrap();
        let handle = transport.send_to_remote(stream).unwrap();

        assert_eq!(fs::read(handle.path()).unwrap(), b"hello world");
        transport.close_session().unwrap();
    }

    #[test]
    fn stage_renames_rather_than_copies_when_source_path_is_known() {
        let scratch = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let source_file = source.path().join("a.txt");
        fs::write(&source_file, b"hello world").unwrap();

        let mut transport = LocalTransport::new(scratch.path().join("xfer"));
        transport.open_session().unwrap();

        let stream = ContentStream::open(&source_file).unwrap();
        let handle = transport.send_to_remote(stream).unwrap();

        assert_eq!(fs::read(handle.path()).unwrap(), b"hello world");
        assert!(!source_file.exists(), "rename should have moved the source file away");
    }

    #[test]
    fn stage_falls_back_to_copy_when_stream_has_no_source_path() {
        let scratch = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let source_file = source.path().join("a.txt");
        fs::write(&source_file, b"hello world").unwrap();

        let mut transport = LocalTransport::new(scratch.path().join("xfer"));
        transport.open_session().unwrap();

        // A stream wrapped from an already-open handle carries no
        // source path, so `stage` can't take the rename shortcut.
        let file = fs::File::open(&source_file).unwrap();
        let stream = ContentStream::from_file(file).unwrap();
        let handle = transport.send_to_remote(stream).unwrap();

        assert_eq!(fs::read(handle.path()).unwrap(), b"hello world");
        assert!(source_file.exists(), "copy fallback should leave the source file in place");
    }

    #[test]
    fn send_before_open_session_fails() {
        let scratch = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let source_file = source.path().join("a.txt");
        fs::write(&source_file, b"hello").unwrap();

        let mut transport = LocalTransport::new(scratch.path().join("xfer"));
        let stream = ContentStream::open(&source_file).unwrap();
        assert!(transport.send_to_remote(stream).is_err());
    }
}

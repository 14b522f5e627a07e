//! `ContentStream`: a finite, single-shot readable view over one
//! file's bytes, chunked for streaming transfer so the coordinator
//! never buffers a whole file in memory.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::TransportResult;

pub struct ContentStream {
    reader: BufReader<File>,
    size: u64,
    exhausted: bool,
    source_path: Option<PathBuf>,
}

impl ContentStream {
    pub fn open(path: &Path) -> TransportResult<Self> {
        let file = File::open(path)?;
        let mut stream = Self::from_file(file)?;
        stream.source_path = Some(path.to_path_buf());
        Ok(stream)
    }

    /// Wrap an already-open file handle, for callers (like the remote
    /// filesystem's `send`) that open content without going through a
    /// path the transport itself resolves. Carries no `source_path`,
    /// so a transport can't take the zero-copy rename shortcut on it.
    pub fn from_file(file: File) -> TransportResult<Self> {
        let size = file.metadata()?.len();
        Ok(Self { reader: BufReader::new(file), size, exhausted: false, source_path: None })
    }

    /// Total size of the underlying file, known up front.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The file this stream was opened from, if any. A same-host
    /// transport can rename this path directly instead of copying the
    /// bytes through `read`.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Reads up to `chunk_size` bytes. Returns `Ok(None)` once the
    /// stream is exhausted; a single-shot stream cannot be rewound or
    /// read again after that.
    pub fn read(&mut self, chunk_size: usize) -> TransportResult<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut buf = vec![0u8; chunk_size];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

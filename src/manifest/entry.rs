//! Manifest entry variants: `FileRef` and `LinkRef`
//!
//! Per the data model, entries are discriminated by shape on the wire
//! (`FileRef` carries `hash`/`filesize`; `LinkRef` carries
//! `reference`) rather than by an explicit tag field, so the on-disk
//! format matches what a hand-written reader would expect. `serde`'s
//! `untagged` representation gives us exactly that shape for free.

use serde::{Deserialize, Serialize};

/// A regular file entry: size, modification time, content hash, and
/// the user id of whoever last wrote it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    /// File size in bytes.
    pub filesize: u64,
    /// Last-modified time, RFC3339.
    pub mtime: String,
    /// Lowercase-hex XXH3-64 digest of the file's full content.
    pub hash: String,
    /// User id of the writer that produced this entry.
    pub user: String,
}

impl FileRef {
    pub fn new(filesize: u64, mtime: impl Into<String>, hash: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            filesize,
            mtime: mtime.into(),
            hash: hash.into(),
            user: user.into(),
        }
    }
}

/// A symlink entry: the link target, recorded verbatim, never resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkRef {
    /// The symlink's target, as a relative path string, unresolved.
    pub reference: String,
    /// User id of the writer that produced this entry.
    pub user: String,
}

impl LinkRef {
    pub fn new(reference: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            user: user.into(),
        }
    }
}

/// A manifest entry: either a file or a symlink.
///
/// Equality is structural: two `FileRef`s are equal iff their hashes
/// match (size and mtime are informational); two `LinkRef`s are equal
/// iff their targets match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Entry {
    File(FileRef),
    Link(LinkRef),
}

impl Entry {
    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            Entry::File(f) => Some(f),
            Entry::Link(_) => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkRef> {
        match self {
            Entry::Link(l) => Some(l),
            Entry::File(_) => None,
        }
    }

    pub fn user(&self) -> &str {
        match self {
            Entry::File(f) => &f.user,
            Entry::Link(l) => &l.user,
        }
    }

    /// Structural equality per the content-addressed comparison the
    /// merger relies on: file entries compare by hash only, link
    /// entries by target only.
    pub fn content_equals(&self, other: &Entry) -> bool {
        match (self, other) {
            (Entry::File(a), Entry::File(b)) => a.hash == b.hash,
            (Entry::Link(a), Entry::Link(b)) => a.reference == b.reference,
            _ => false,
        }
    }

    /// Canonical byte representation used to fold this entry into
    /// `entries_hash`. Stable field ordering, independent of map
    /// iteration order.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Entry::File(f) => format!("F\0{}\0{}", f.filesize, f.hash).into_bytes(),
            Entry::Link(l) => format!("L\0{}", l.reference).into_bytes(),
        }
    }
}

//! The `Manifest` type: an insertion-ordered map from `RepoPath` to
//! `Entry`, plus its `ManifestMetadata`.
//!
//! Manifests are immutable once constructed (per the data model's
//! lifecycle rules): every operation here that would "change" a
//! manifest instead returns a new one. The only three ways to
//! construct one are the scanner (`scanner::scan`), deserializing a
//! local cache, or deserializing a remote manifest — `Manifest` itself
//! only knows how to hold, hash, serialize, and compare entries.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::entry::Entry;
use super::errors::{ManifestError, ManifestResult};
use super::hash::{entries_hash, snapshot_hash};
use super::metadata::ManifestMetadata;
use super::path::RepoPath;

/// On-disk shape of `last-sync.json`: `{ "entries": {...}, "metadata": {...} }`.
#[derive(Serialize, Deserialize)]
struct ManifestFile {
    entries: indexmap_compat::OrderedEntries,
    metadata: Option<ManifestMetadata>,
}

/// A small ordered-map shim so `serde_json` serializes entries in
/// insertion order (scanner traversal order) without pulling in the
/// `indexmap` crate for a single use site.
mod indexmap_compat {
    use super::*;

    #[derive(Default)]
    pub struct OrderedEntries(pub Vec<(String, Entry)>);

    impl Serialize for OrderedEntries {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            use serde::ser::SerializeMap;
            let mut map = serializer.serialize_map(Some(self.0.len()))?;
            for (k, v) in &self.0 {
                map.serialize_entry(k, v)?;
            }
            map.end()
        }
    }

    impl<'de> Deserialize<'de> for OrderedEntries {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            // serde_json preserves key order from the input document
            // when deserializing into a Vec<(String, V)> via a map
            // visitor, so entries round-trip in file order.
            struct Visitor;
            impl<'de> serde::de::Visitor<'de> for Visitor {
                type Value = OrderedEntries;

                fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str("a map of path to entry")
                }

                fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
                where
                    A: serde::de::MapAccess<'de>,
                {
                    let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                    while let Some((k, v)) = map.next_entry::<String, Entry>()? {
                        entries.push((k, v));
                    }
                    Ok(OrderedEntries(entries))
                }
            }
            deserializer.deserialize_map(Visitor)
        }
    }
}

/// An insertion-ordered mapping from repository path to entry, plus
/// metadata describing the snapshot it represents (metadata is absent
/// for manifests that don't yet correspond to a committed snapshot,
/// e.g. a freshly scanned `L`).
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    order: Vec<RepoPath>,
    entries: HashMap<RepoPath, Entry>,
    metadata: Option<ManifestMetadata>,
}

impl Manifest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Construct from an already-ordered list of (path, entry) pairs.
    pub fn from_entries(ordered: Vec<(RepoPath, Entry)>, metadata: Option<ManifestMetadata>) -> Self {
        let mut order = Vec::with_capacity(ordered.len());
        let mut entries = HashMap::with_capacity(ordered.len());
        for (path, entry) in ordered {
            order.push(path.clone());
            entries.insert(path, entry);
        }
        Self { order, entries, metadata }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &RepoPath) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &RepoPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterate entries in insertion (traversal) order.
    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &Entry)> {
        self.order.iter().map(move |p| (p, &self.entries[p]))
    }

    pub fn paths(&self) -> impl Iterator<Item = &RepoPath> {
        self.order.iter()
    }

    pub fn metadata(&self) -> Option<&ManifestMetadata> {
        self.metadata.as_ref()
    }

    pub fn with_metadata(mut self, metadata: ManifestMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Order-independent hash of all entries (invariant 3).
    pub fn compute_entries_hash(&self) -> String {
        let mut pairs: Vec<(&str, Vec<u8>)> = self
            .order
            .iter()
            .map(|p| (p.as_str(), self.entries[p].canonical_bytes()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        entries_hash(pairs.iter().map(|(p, b)| (*p, b.as_slice())))
    }

    /// `snapshot_hash = xxh3_64(entries_hash || message || previous_or_empty)`.
    pub fn compute_snapshot_hash(&self, message: &str, previous_hash: Option<&str>) -> String {
        snapshot_hash(&self.compute_entries_hash(), message, previous_hash)
    }

    /// Structural equality: same paths, each entry content-equal.
    pub fn equals(&self, other: &Manifest) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(path, entry)| {
            other
                .entries
                .get(path)
                .is_some_and(|o| entry.content_equals(o))
        })
    }

    /// Canonical JSON serialization: stable key order inside entries,
    /// insertion order of paths. `include_metadata` controls whether
    /// the `metadata` field is emitted (a freshly scanned `L` has none
    /// to write until the new snapshot's metadata is computed).
    pub fn serialize<W: Write>(&self, writer: W, include_metadata: bool) -> ManifestResult<()> {
        let file = ManifestFile {
            entries: indexmap_compat::OrderedEntries(
                self.order
                    .iter()
                    .map(|p| (p.as_str().to_string(), self.entries[p].clone()))
                    .collect(),
            ),
            metadata: if include_metadata { self.metadata.clone() } else { None },
        };
        serde_json::to_writer_pretty(writer, &file).map_err(ManifestError::from)
    }

    pub fn to_json_string(&self, include_metadata: bool) -> ManifestResult<String> {
        let mut buf = Vec::new();
        self.serialize(&mut buf, include_metadata)?;
        Ok(String::from_utf8(buf).expect("serde_json output is valid utf-8"))
    }

    /// Deserialize from `last-sync.json`'s shape. Fails with
    /// `BadManifest` on schema mismatch or unknown required fields.
    pub fn deserialize<R: Read>(reader: R) -> ManifestResult<Self> {
        let file: ManifestFile = serde_json::from_reader(reader)?;
        let mut order = Vec::with_capacity(file.entries.0.len());
        let mut entries = HashMap::with_capacity(file.entries.0.len());
        for (raw_path, entry) in file.entries.0 {
            let path = RepoPath::new(&raw_path)?;
            order.push(path.clone());
            entries.insert(path, entry);
        }
        Ok(Self { order, entries, metadata: file.metadata })
    }

    pub fn from_json_str(s: &str) -> ManifestResult<Self> {
        Self::deserialize(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::entry::FileRef;

    fn sample() -> Manifest {
        Manifest::from_entries(
            vec![
                (
                    RepoPath::new("a.txt").unwrap(),
                    Entry::File(FileRef::new(6, "2026-01-01T00:00:00Z", "aaaa", "alice")),
                ),
                (
                    RepoPath::new("dir/b.txt").unwrap(),
                    Entry::File(FileRef::new(6, "2026-01-01T00:00:00Z", "bbbb", "alice")),
                ),
            ],
            None,
        )
    }

    #[test]
    fn round_trip_preserves_entries() {
        let m = sample();
        let json = m.to_json_string(false).unwrap();
        let back = Manifest::from_json_str(&json).unwrap();
        assert!(m.equals(&back));
        assert_eq!(m.len(), back.len());
    }

    #[test]
    fn entries_hash_is_stable_across_reordering() {
        let a = sample();
        let b = Manifest::from_entries(
            a.iter().rev().map(|(p, e)| (p.clone(), e.clone())).collect(),
            None,
        );
        assert_eq!(a.compute_entries_hash(), b.compute_entries_hash());
    }

    #[test]
    fn serialization_preserves_insertion_order() {
        let m = sample();
        let json = m.to_json_string(false).unwrap();
        let a_pos = json.find("a.txt").unwrap();
        let b_pos = json.find("dir/b.txt").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn bad_manifest_on_schema_mismatch() {
        let bad = r#"{"entries": "not-a-map", "metadata": null}"#;
        assert!(Manifest::from_json_str(bad).is_err());
    }

    #[test]
    fn equals_ignores_mtime_differences() {
        let a = sample();
        let mut entries: Vec<_> = a.iter().map(|(p, e)| (p.clone(), e.clone())).collect();
        if let Entry::File(f) = &mut entries[0].1 {
            f.mtime = "2099-01-01T00:00:00Z".to_string();
        }
        let b = Manifest::from_entries(entries, None);
        assert!(a.equals(&b));
    }
}

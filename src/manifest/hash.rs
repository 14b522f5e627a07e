//! XXH3-64 hashing primitives
//!
//! All content hashes, `entries_hash`, and `snapshot_hash` in this
//! crate are 64-bit XXH3 digests, hex-encoded lowercase. Centralizing
//! the encoding here keeps every caller byte-for-byte consistent.

use xxhash_rust::xxh3::Xxh3;

/// Hex-encode a 64-bit digest the way every hash in this crate is
/// represented on the wire.
fn hex_u64(value: u64) -> String {
    format!("{:016x}", value)
}

/// XXH3-64 of a byte slice, hex-encoded.
pub fn xxh3_hex(data: &[u8]) -> String {
    hex_u64(xxhash_rust::xxh3::xxh3_64(data))
}

/// XXH3-64 of a file's full content, streamed so large files don't
/// need to be buffered whole.
pub fn xxh3_hex_reader<R: std::io::Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Xxh3::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_u64(hasher.digest()))
}

/// `entries_hash`: an order-independent fold of sorted `(path,
/// canonical entry bytes)` pairs. Callers are expected to have
/// already sorted `pairs` by path so the result doesn't depend on
/// manifest insertion order (invariant 3 of the specification).
pub fn entries_hash<'a>(sorted_pairs: impl Iterator<Item = (&'a str, &'a [u8])>) -> String {
    let mut hasher = Xxh3::new();
    for (path, bytes) in sorted_pairs {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(bytes);
        hasher.update(b"\n");
    }
    hex_u64(hasher.digest())
}

/// `snapshot_hash = xxh3_64(entries_hash || snapshot_message ||
/// previous_snapshot_hash_or_empty)`.
pub fn snapshot_hash(entries_hash: &str, message: &str, previous_hash: Option<&str>) -> String {
    let mut hasher = Xxh3::new();
    hasher.update(entries_hash.as_bytes());
    hasher.update(message.as_bytes());
    hasher.update(previous_hash.unwrap_or("").as_bytes());
    hex_u64(hasher.digest())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxh3_hex_is_deterministic() {
        let a = xxh3_hex(b"hello\n");
        let b = xxh3_hex(b"hello\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn reader_hash_matches_slice_hash() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(1000);
        let from_slice = xxh3_hex(&data);
        let from_reader = xxh3_hex_reader(std::io::Cursor::new(&data)).unwrap();
        assert_eq!(from_slice, from_reader);
    }

    #[test]
    fn entries_hash_is_order_independent() {
        let a = [("a.txt", b"1".as_slice()), ("b.txt", b"2".as_slice())];
        let b = [("b.txt", b"2".as_slice()), ("a.txt", b"1".as_slice())];

        let mut sorted_a: Vec<_> = a.to_vec();
        sorted_a.sort_by_key(|(p, _)| *p);
        let mut sorted_b: Vec<_> = b.to_vec();
        sorted_b.sort_by_key(|(p, _)| *p);

        let hash_a = entries_hash(sorted_a.into_iter());
        let hash_b = entries_hash(sorted_b.into_iter());
        assert_eq!(hash_a, hash_b);
    }

    #[test]
    fn snapshot_hash_changes_with_any_input() {
        let base = snapshot_hash("e1", "init", None);
        let with_different_message = snapshot_hash("e1", "other", None);
        let with_previous = snapshot_hash("e1", "init", Some("deadbeef"));
        assert_ne!(base, with_different_message);
        assert_ne!(base, with_previous);
    }

    #[test]
    fn snapshot_hash_chain_is_tamper_evident() {
        let s1 = snapshot_hash("e1", "init", None);
        let s2 = snapshot_hash("e2", "add file", Some(&s1));

        // Tampering with s1's inputs changes s1's hash, which changes s2.
        let tampered_s1 = snapshot_hash("e1-tampered", "init", None);
        let tampered_s2 = snapshot_hash("e2", "add file", Some(&tampered_s1));
        assert_ne!(s2, tampered_s2);
    }
}

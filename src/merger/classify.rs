//! The pure classification function: `classify(l, c, r) -> SyncState`.

use crate::manifest::Entry;

use super::state::SyncState;

/// Classify a single path's presence/equality combination across `L`
/// (working tree), `C` (cache), and `R` (remote).
///
/// Exactly one of `L`, `C`, `R` absent from all three (`None, None,
/// None`) never occurs in practice — `classify` is only ever invoked
/// for a path present in the union of all three manifests' key sets —
/// but the match below is still exhaustive over every presence
/// combination, so a caller violating that contract panics loudly
/// rather than silently returning a wrong state.
pub fn classify(l: Option<&Entry>, c: Option<&Entry>, r: Option<&Entry>) -> SyncState {
    match (l, c, r) {
        (Some(l), Some(c), Some(r)) => classify_all_present(l, c, r),
        (Some(l), Some(c), None) => {
            if l.content_equals(c) {
                SyncState::DeletedRemote
            } else {
                SyncState::ConflictDeletedRemote
            }
        }
        (None, Some(c), Some(r)) => {
            if c.content_equals(r) {
                SyncState::DeletedLocal
            } else {
                SyncState::ConflictDeletedLocal
            }
        }
        (Some(l), None, Some(r)) => {
            if l.content_equals(r) {
                SyncState::CacheRepairNew
            } else {
                SyncState::ConflictUncachedDivergence
            }
        }
        (Some(_), None, None) => SyncState::NewLocal,
        (None, Some(_), None) => SyncState::OrphanedCache,
        (None, None, Some(_)) => SyncState::NewRemote,
        (None, None, None) => {
            unreachable!("classify called for a path absent from L, C, and R")
        }
    }
}

fn classify_all_present(l: &Entry, c: &Entry, r: &Entry) -> SyncState {
    let lc = l.content_equals(c);
    let cr = c.content_equals(r);
    let lr = l.content_equals(r);

    if lc && cr {
        // Equality is transitive over content hashes, so lc && cr forces lr.
        SyncState::AllEqual
    } else if lc && !cr {
        SyncState::RemoteChanged
    } else if cr && !lc {
        SyncState::LocalChanged
    } else if lr {
        SyncState::CacheDrifted
    } else {
        SyncState::Conflict3Way
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FileRef;

    fn file(hash: &str) -> Entry {
        Entry::File(FileRef::new(1, "2026-01-01T00:00:00Z", hash, "alice"))
    }

    #[test]
    fn all_equal() {
        let e = file("aaaa");
        assert_eq!(classify(Some(&e), Some(&e), Some(&e)), SyncState::AllEqual);
    }

    #[test]
    fn remote_changed() {
        let l = file("aaaa");
        let c = file("aaaa");
        let r = file("bbbb");
        assert_eq!(classify(Some(&l), Some(&c), Some(&r)), SyncState::RemoteChanged);
    }

    #[test]
    fn local_changed() {
        let l = file("cccc");
        let c = file("aaaa");
        let r = file("aaaa");
        assert_eq!(classify(Some(&l), Some(&c), Some(&r)), SyncState::LocalChanged);
    }

    #[test]
    fn cache_drifted() {
        let l = file("aaaa");
        let c = file("dddd");
        let r = file("aaaa");
        assert_eq!(classify(Some(&l), Some(&c), Some(&r)), SyncState::CacheDrifted);
    }

    #[test]
    fn three_way_conflict() {
        let l = file("aaaa");
        let c = file("bbbb");
        let r = file("cccc");
        assert_eq!(classify(Some(&l), Some(&c), Some(&r)), SyncState::Conflict3Way);
    }

    #[test]
    fn deleted_remote_clean() {
        let e = file("aaaa");
        assert_eq!(classify(Some(&e), Some(&e), None), SyncState::DeletedRemote);
    }

    #[test]
    fn deleted_remote_conflict() {
        let l = file("aaaa");
        let c = file("bbbb");
        assert_eq!(classify(Some(&l), Some(&c), None), SyncState::ConflictDeletedRemote);
    }

    #[test]
    fn deleted_local_clean() {
        let e = file("aaaa");
        assert_eq!(classify(None, Some(&e), Some(&e)), SyncState::DeletedLocal);
    }

    #[test]
    fn deleted_local_conflict() {
        let c = file("aaaa");
        let r = file("bbbb");
        assert_eq!(classify(None, Some(&c), Some(&r)), SyncState::ConflictDeletedLocal);
    }

    #[test]
    fn cache_repair_new() {
        let e = file("aaaa");
        assert_eq!(classify(Some(&e), None, Some(&e)), SyncState::CacheRepairNew);
    }

    #[test]
    fn uncached_divergence() {
        let l = file("aaaa");
        let r = file("bbbb");
        assert_eq!(classify(Some(&l), None, Some(&r)), SyncState::ConflictUncachedDivergence);
    }

    #[test]
    fn new_local_only() {
        let e = file("aaaa");
        assert_eq!(classify(Some(&e), None, None), SyncState::NewLocal);
    }

    #[test]
    fn orphaned_cache_only() {
        let e = file("aaaa");
        assert_eq!(classify(None, Some(&e), None), SyncState::OrphanedCache);
    }

    #[test]
    fn new_remote_only() {
        let e = file("aaaa");
        assert_eq!(classify(None, None, Some(&e)), SyncState::NewRemote);
    }

    #[test]
    #[should_panic]
    fn absent_from_all_three_panics() {
        classify(None, None, None);
    }
}

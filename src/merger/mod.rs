//! The merger: classifies every path across L, C, and R into one of
//! the fifteen `SyncState`s.

mod classify;
mod state;

pub use classify::classify;
pub use state::SyncState;

use std::collections::BTreeMap;

use crate::manifest::{Manifest, RepoPath};

/// Classify every path present in any of `l`, `c`, `r`.
///
/// Paths are returned sorted, so downstream plan construction and
/// diagnostics are deterministic regardless of each manifest's
/// internal iteration order.
pub fn merge(l: &Manifest, c: &Manifest, r: &Manifest) -> BTreeMap<RepoPath, SyncState> {
    let mut paths: BTreeMap<RepoPath, SyncState> = BTreeMap::new();

    let mut seen: Vec<&RepoPath> = Vec::new();
    for m in [l, c, r] {
        for p in m.paths() {
            seen.push(p);
        }
    }

    for path in seen {
        if paths.contains_key(path) {
            continue;
        }
        let state = classify(l.get(path), c.get(path), r.get(path));
        paths.insert(path.clone(), state);
    }

    paths
}

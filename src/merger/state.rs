//! The 15-state three-way classification.

use std::fmt;

/// The outcome of classifying a single path across `L` (working tree),
/// `C` (cache), and `R` (remote).
///
/// Every variant corresponds to exactly one row of the classification
/// table; there is no catch-all, so adding a sixteenth presence
/// combination would fail to compile rather than silently falling
/// through to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// Present everywhere, all equal. Nothing to do.
    AllEqual,
    /// L equals C; R differs. Remote changed since the last sync.
    RemoteChanged,
    /// C equals R; L differs. Local changed since the last sync.
    LocalChanged,
    /// L equals R but C differs from both. The cache itself drifted.
    CacheDrifted,
    /// Present everywhere, all three pairwise distinct.
    Conflict3Way,
    /// On L and C, equal; absent from R.
    DeletedRemote,
    /// On L and C, L differs from C; absent from R.
    ConflictDeletedRemote,
    /// Absent from L; present on C and R, equal.
    DeletedLocal,
    /// Absent from L; present on C and R, C differs from R.
    ConflictDeletedLocal,
    /// Absent from C; present on L and R, equal.
    CacheRepairNew,
    /// Absent from C; present on L and R, L differs from R.
    ConflictUncachedDivergence,
    /// Only present on L.
    NewLocal,
    /// Only present on C (orphaned cache entry).
    OrphanedCache,
    /// Only present on R.
    NewRemote,
}

impl SyncState {
    /// Whether this state requires manual resolution and blocks sync.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SyncState::Conflict3Way
                | SyncState::ConflictDeletedRemote
                | SyncState::ConflictDeletedLocal
                | SyncState::ConflictUncachedDivergence
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::AllEqual => "LCR_all_eq",
            SyncState::RemoteChanged => "LCR_L=C!=R",
            SyncState::LocalChanged => "LCR_C=R!=L",
            SyncState::CacheDrifted => "LCR_L=R!=C",
            SyncState::Conflict3Way => "LCR_all_ne",
            SyncState::DeletedRemote => "LC_xR_L=C",
            SyncState::ConflictDeletedRemote => "LC_xR_L!=C",
            SyncState::DeletedLocal => "xLC_R_C=R",
            SyncState::ConflictDeletedLocal => "xLC_R_C!=R",
            SyncState::CacheRepairNew => "L_xC_R_L=R",
            SyncState::ConflictUncachedDivergence => "L_xC_R_L!=R",
            SyncState::NewLocal => "L_xC_xR",
            SyncState::OrphanedCache => "xL_C_xR",
            SyncState::NewRemote => "xL_xC_R",
        };
        write!(f, "{}", s)
    }
}

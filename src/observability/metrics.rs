//! Metrics registry for the sync engine.
//!
//! Counters only, monotonic, reset on process start. Thread-safe via
//! atomics rather than a lock around the whole registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Metrics registry containing all operational counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    files_uploaded: AtomicU64,
    files_downloaded: AtomicU64,
    bytes_uploaded: AtomicU64,
    bytes_downloaded: AtomicU64,
    files_deleted_local: AtomicU64,
    files_deleted_remote: AtomicU64,
    conflicts_detected: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    client_commit_retries: AtomicU64,
    client_commit_exhausted: AtomicU64,
    snapshots_created: AtomicU64,
    archives_written: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bytes_uploaded(&self, bytes: u64) {
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_downloaded(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_files_uploaded(&self) {
        self.files_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_downloaded(&self) {
        self.files_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_deleted_local(&self) {
        self.files_deleted_local.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files_deleted_remote(&self) {
        self.files_deleted_remote.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_conflicts_detected(&self) {
        self.conflicts_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_committed(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_transactions_rolled_back(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_client_commit_retries(&self) {
        self.client_commit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_client_commit_exhausted(&self) {
        self.client_commit_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots_created(&self) {
        self.snapshots_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_archives_written(&self) {
        self.archives_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded.load(Ordering::Relaxed)
    }

    /// Current values as a JSON object.
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"files_uploaded":{},"files_downloaded":{},"bytes_uploaded":{},"bytes_downloaded":{},"files_deleted_local":{},"files_deleted_remote":{},"conflicts_detected":{},"transactions_committed":{},"transactions_rolled_back":{},"client_commit_retries":{},"client_commit_exhausted":{},"snapshots_created":{},"archives_written":{}}}"#,
            self.files_uploaded.load(Ordering::Relaxed),
            self.files_downloaded.load(Ordering::Relaxed),
            self.bytes_uploaded.load(Ordering::Relaxed),
            self.bytes_downloaded.load(Ordering::Relaxed),
            self.files_deleted_local.load(Ordering::Relaxed),
            self.files_deleted_remote.load(Ordering::Relaxed),
            self.conflicts_detected.load(Ordering::Relaxed),
            self.transactions_committed.load(Ordering::Relaxed),
            self.transactions_rolled_back.load(Ordering::Relaxed),
            self.client_commit_retries.load(Ordering::Relaxed),
            self.client_commit_exhausted.load(Ordering::Relaxed),
            self.snapshots_created.load(Ordering::Relaxed),
            self.archives_written.load(Ordering::Relaxed),
        )
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            files_downloaded: self.files_downloaded.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            files_deleted_local: self.files_deleted_local.load(Ordering::Relaxed),
            files_deleted_remote: self.files_deleted_remote.load(Ordering::Relaxed),
            conflicts_detected: self.conflicts_detected.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            client_commit_retries: self.client_commit_retries.load(Ordering::Relaxed),
            client_commit_exhausted: self.client_commit_exhausted.load(Ordering::Relaxed),
            snapshots_created: self.snapshots_created.load(Ordering::Relaxed),
            archives_written: self.archives_written.load(Ordering::Relaxed),
        }
    }
}

static GLOBAL: OnceLock<MetricsRegistry> = OnceLock::new();

/// Process-wide registry shared by every transaction this process runs.
pub fn global() -> &'static MetricsRegistry {
    GLOBAL.get_or_init(MetricsRegistry::new)
}

/// A point-in-time snapshot of all metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_uploaded: u64,
    pub files_downloaded: u64,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
    pub files_deleted_local: u64,
    pub files_deleted_remote: u64,
    pub conflicts_detected: u64,
    pub transactions_committed: u64,
    pub transactions_rolled_back: u64,
    pub client_commit_retries: u64,
    pub client_commit_exhausted: u64,
    pub snapshots_created: u64,
    pub archives_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_has_zero_values() {
        let registry = MetricsRegistry::new();
        let snapshot = registry.snapshot();

        assert_eq!(snapshot.files_uploaded, 0);
        assert_eq!(snapshot.bytes_uploaded, 0);
        assert_eq!(snapshot.transactions_committed, 0);
    }

    #[test]
    fn bytes_accumulate() {
        let registry = MetricsRegistry::new();

        registry.add_bytes_uploaded(100);
        assert_eq!(registry.bytes_uploaded(), 100);

        registry.add_bytes_uploaded(50);
        assert_eq!(registry.bytes_uploaded(), 150);
    }

    #[test]
    fn counters_increment_independently() {
        let registry = MetricsRegistry::new();

        registry.increment_files_uploaded();
        registry.increment_files_uploaded();
        registry.increment_files_downloaded();
        registry.increment_conflicts_detected();
        registry.increment_transactions_committed();
        registry.increment_transactions_rolled_back();
        registry.increment_client_commit_retries();
        registry.increment_client_commit_exhausted();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.files_uploaded, 2);
        assert_eq!(snapshot.files_downloaded, 1);
        assert_eq!(snapshot.conflicts_detected, 1);
        assert_eq!(snapshot.transactions_committed, 1);
        assert_eq!(snapshot.transactions_rolled_back, 1);
        assert_eq!(snapshot.client_commit_retries, 1);
        assert_eq!(snapshot.client_commit_exhausted, 1);
    }

    #[test]
    fn to_json_is_valid_and_exact() {
        let registry = MetricsRegistry::new();
        registry.add_bytes_uploaded(1234);
        registry.increment_files_uploaded();

        let json = registry.to_json();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["bytes_uploaded"], 1234);
        assert_eq!(parsed["files_uploaded"], 1);
    }

    #[test]
    fn thread_safe_under_concurrent_increments() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_files_uploaded();
                    reg.add_bytes_uploaded(1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.files_uploaded, 1000);
        assert_eq!(snapshot.bytes_uploaded, 1000);
    }

    #[test]
    fn global_returns_the_same_instance_every_call() {
        global().increment_snapshots_created();
        let before = global().snapshot().snapshots_created;
        global().increment_snapshots_created();
        assert_eq!(global().snapshot().snapshots_created, before + 1);
    }

    #[test]
    fn monotonic_increase() {
        let registry = MetricsRegistry::new();

        let mut prev = registry.snapshot().bytes_uploaded;
        for _ in 0..10 {
            registry.add_bytes_uploaded(10);
            let current = registry.snapshot().bytes_uploaded;
            assert!(current >= prev);
            prev = current;
        }
    }
}

//! Re-running `sync` against an unchanged tree reports `UpToDate` and
//! advances nothing; repeated `status` calls agree with each other.

use dsg::config::{FilesystemXfsSpec, NoopProgressSink, RepositoryConfig};
use dsg::lifecycle::{init, log, status, sync, SyncOutcome};
use tempfile::TempDir;

fn local_config(mountpoint: &std::path::Path) -> RepositoryConfig {
    RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
        host: "localhost".into(),
        mountpoint: mountpoint.display().to_string(),
    })
}

#[test]
fn syncing_an_unchanged_tree_is_a_no_op() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"stable").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    let result = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "nothing changed",
        false,
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap();

    assert!(matches!(result.outcome, SyncOutcome::UpToDate));

    let history = log(root.path()).unwrap();
    assert_eq!(history.snapshots.len(), 1, "an up-to-date sync must not advance the chain");
}

#[test]
fn repeated_sync_calls_with_no_changes_stay_up_to_date() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"stable").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    for _ in 0..3 {
        let result = sync(
            &config,
            root.path(),
            "alice",
            "localhost",
            "still nothing",
            false,
            false,
            false,
            &NoopProgressSink,
        )
        .unwrap();
        assert!(matches!(result.outcome, SyncOutcome::UpToDate));
    }

    let history = log(root.path()).unwrap();
    assert_eq!(history.snapshots.len(), 1);
}

#[test]
fn status_without_touching_anything_between_calls_is_stable() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"v1").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    let first = status(&config, root.path(), "alice", "localhost", true).unwrap();
    let second = status(&config, root.path(), "alice", "localhost", true).unwrap();

    assert_eq!(first.classification.len(), second.classification.len());
    for (path, state) in &first.classification {
        assert_eq!(second.classification.get(path), Some(state));
    }
    assert!(first.plan.is_empty());
    assert!(second.plan.is_empty());
}

//! The six concrete end-to-end scenarios: init from empty, an
//! upload-only sync, a conflict-blocked sync, delete reconciliation,
//! a dry-run preview, and the NFC normalization path.

use dsg::config::{FilesystemXfsSpec, NoopProgressSink, RepositoryConfig};
use dsg::lifecycle::{clone_repository, init, sync, SyncOutcome};
use dsg::merger::SyncState;
use dsg::planner::OperationKind;
use tempfile::TempDir;

fn local_config(mountpoint: &std::path::Path) -> RepositoryConfig {
    RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
        host: "localhost".into(),
        mountpoint: mountpoint.display().to_string(),
    })
}

#[test]
fn scenario_init_from_empty_working_tree() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    let result = init(
        &config,
        root.path(),
        "alice",
        "localhost",
        "empty repository",
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap();

    assert_eq!(result.snapshot_id, "s1");
    assert_eq!(result.entry_count, 0);
}

#[test]
fn scenario_upload_only_sync_advances_the_chain() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("notes.txt"), b"v1").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    std::fs::write(root.path().join("notes.txt"), b"v2").unwrap();
    std::fs::write(root.path().join("new.txt"), b"brand new").unwrap();
    let result = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "edit notes, add new.txt",
        false,
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap();

    match result.outcome {
        SyncOutcome::Committed { snapshot_id, uploaded, .. } => {
            assert_eq!(snapshot_id, "s2");
            assert_eq!(uploaded, 2);
        }
        other => panic!("expected Committed, got {:?}", other),
    }
    assert_eq!(std::fs::read(remote.path().join("notes.txt")).unwrap(), b"v2");
    assert_eq!(std::fs::read(remote.path().join("new.txt")).unwrap(), b"brand new");
}

#[test]
fn scenario_three_way_conflict_blocks_sync() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("shared.txt"), b"original").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    // Local and remote both drift from the cached value, disagreeing
    // with each other: a genuine three-way conflict.
    std::fs::write(root.path().join("shared.txt"), b"alice's edit").unwrap();
    std::fs::write(remote.path().join("shared.txt"), b"bob's edit").unwrap();

    let err = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "conflicting edit",
        false,
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap_err();

    assert_eq!(err.kind(), dsg::errors::ErrorKind::ConflictsBlockSync);
    // Neither side was touched: the conflict was refused before any
    // transaction opened.
    assert_eq!(std::fs::read(root.path().join("shared.txt")).unwrap(), b"alice's edit");
    assert_eq!(std::fs::read(remote.path().join("shared.txt")).unwrap(), b"bob's edit");
}

#[test]
fn scenario_delete_reconciles_in_both_directions() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("keep.txt"), b"stays").unwrap();
    std::fs::write(root.path().join("local_only.txt"), b"deleted locally next").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    std::fs::remove_file(root.path().join("local_only.txt")).unwrap();
    let result = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "delete local_only.txt",
        false,
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap();

    match result.outcome {
        SyncOutcome::Committed { deleted_remote, .. } => assert_eq!(deleted_remote, 1),
        other => panic!("expected Committed, got {:?}", other),
    }
    assert!(!remote.path().join("local_only.txt").exists());
    assert!(remote.path().join("keep.txt").exists());
}

#[test]
fn scenario_dry_run_previews_the_plan_without_committing() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"v1").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    std::fs::write(root.path().join("b.txt"), b"v1").unwrap();
    let result = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "would add b.txt",
        true,
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap();

    match result.outcome {
        SyncOutcome::Preview(plan) => {
            assert_eq!(plan.uploads.len(), 1);
            assert_eq!(plan.kind, Some(OperationKind::Sync));
        }
        other => panic!("expected Preview, got {:?}", other),
    }
    assert!(!remote.path().join("b.txt").exists());
}

#[test]
fn scenario_nfc_normalization_repairs_and_syncs_a_decomposed_name() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    // "kilometro" with a combining acute accent (NFD), not the
    // precomposed form.
    let nfd_name = "kilo\u{0301}metro.csv";
    std::fs::write(root.path().join(nfd_name), b"42").unwrap();

    let blocked = init(
        &config,
        root.path(),
        "alice",
        "localhost",
        "first",
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap_err();
    assert_eq!(blocked.kind(), dsg::errors::ErrorKind::ValidationBlocked);

    let result = init(
        &config,
        root.path(),
        "alice",
        "localhost",
        "first, normalized",
        false,
        true,
        &NoopProgressSink,
    )
    .unwrap();
    assert_eq!(result.entry_count, 1);

    let nfc_name = "kilómetro.csv";
    assert!(root.path().join(nfc_name).exists());
    assert!(remote.path().join(nfc_name).exists());
}

#[test]
fn clone_after_init_reproduces_the_same_snapshot_elsewhere() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"shared content").unwrap();
    let init_result =
        init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
            .unwrap();

    let clone_root = TempDir::new().unwrap();
    let clone_result =
        clone_repository(&config, clone_root.path(), "bob", "localhost", &NoopProgressSink)
            .unwrap();

    assert_eq!(clone_result.snapshot_id, init_result.snapshot_id);
    assert_eq!(
        std::fs::read(clone_root.path().join("a.txt")).unwrap(),
        b"shared content"
    );

    let status = dsg::lifecycle::status(&config, clone_root.path(), "bob", "localhost", false)
        .unwrap();
    for state in status.classification.values() {
        assert_eq!(*state, SyncState::AllEqual);
    }
}

//! `log()` recomputes the snapshot hash chain link by link; a tampered
//! `sync-messages.json` is caught as `ManifestCorrupt` rather than
//! silently accepted.

use dsg::config::{FilesystemXfsSpec, NoopProgressSink, RepositoryConfig};
use dsg::errors::ErrorKind;
use dsg::lifecycle::{init, log, sync};
use dsg::manifest::ManifestMetadata;
use dsg::repo_layout;
use tempfile::TempDir;

fn local_config(mountpoint: &std::path::Path) -> RepositoryConfig {
    RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
        host: "localhost".into(),
        mountpoint: mountpoint.display().to_string(),
    })
}

#[test]
fn the_chain_validates_across_several_commits() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"v1").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    for n in 2..=4 {
        std::fs::write(root.path().join("a.txt"), format!("v{n}")).unwrap();
        sync(
            &config,
            root.path(),
            "alice",
            "localhost",
            &format!("edit {n}"),
            false,
            false,
            false,
            &NoopProgressSink,
        )
        .unwrap();
    }

    let history = log(root.path()).unwrap();
    assert_eq!(history.snapshots.len(), 4);
    for (i, meta) in history.snapshots.iter().enumerate() {
        assert_eq!(meta.snapshot_id, format!("s{}", i + 1));
    }
}

#[test]
fn a_tampered_message_in_the_chain_is_rejected() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("a.txt"), b"v1").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    std::fs::write(root.path().join("a.txt"), b"v2").unwrap();
    sync(&config, root.path(), "alice", "localhost", "second", false, false, false, &NoopProgressSink)
        .unwrap();

    let path = repo_layout::sync_messages_path(root.path());
    let mut messages: Vec<ManifestMetadata> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    messages[0].snapshot_message = "an attacker rewrote this message".to_string();
    std::fs::write(&path, serde_json::to_string_pretty(&messages).unwrap()).unwrap();

    let err = log(root.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ManifestCorrupt);
}

//! A genuine three-way conflict refuses to sync: no transaction opens,
//! neither side is touched, and the plan names exactly the conflicting
//! paths.

use dsg::config::{FilesystemXfsSpec, NoopProgressSink, RepositoryConfig};
use dsg::errors::ErrorKind;
use dsg::lifecycle::{init, sync};
use tempfile::TempDir;

fn local_config(mountpoint: &std::path::Path) -> RepositoryConfig {
    RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
        host: "localhost".into(),
        mountpoint: mountpoint.display().to_string(),
    })
}

#[test]
fn a_three_way_conflict_is_refused_with_no_override() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("shared.txt"), b"v0").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    std::fs::write(root.path().join("shared.txt"), b"alice wrote this").unwrap();
    std::fs::write(remote.path().join("shared.txt"), b"bob wrote this").unwrap();

    // force=true does not override a conflict: it only waives naming
    // warnings, never a correctness disagreement.
    let err = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "try anyway",
        false,
        true,
        false,
        &NoopProgressSink,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConflictsBlockSync);
    assert_eq!(std::fs::read(root.path().join("shared.txt")).unwrap(), b"alice wrote this");
    assert_eq!(std::fs::read(remote.path().join("shared.txt")).unwrap(), b"bob wrote this");
}

#[test]
fn an_unrelated_clean_file_does_not_mask_a_conflict_elsewhere() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join("conflicted.txt"), b"v0").unwrap();
    std::fs::write(root.path().join("clean.txt"), b"v0").unwrap();
    init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap();

    std::fs::write(root.path().join("conflicted.txt"), b"alice's edit").unwrap();
    std::fs::write(remote.path().join("conflicted.txt"), b"bob's edit").unwrap();
    std::fs::write(root.path().join("clean.txt"), b"alice edited the clean one too").unwrap();

    let err = sync(
        &config,
        root.path(),
        "alice",
        "localhost",
        "mixed change set",
        false,
        false,
        false,
        &NoopProgressSink,
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConflictsBlockSync);
    // The whole sync refuses, including the clean file's change.
    assert_eq!(
        std::fs::read(remote.path().join("clean.txt")).unwrap(),
        b"v0"
    );
}

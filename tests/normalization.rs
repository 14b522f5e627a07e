//! Non-NFC filenames block a sync by default, `force` lets one through
//! as-is, and `normalize` repairs it on disk before the sync runs.

use dsg::config::{FilesystemXfsSpec, NoopProgressSink, RepositoryConfig};
use dsg::errors::ErrorKind;
use dsg::lifecycle::init;
use tempfile::TempDir;

fn local_config(mountpoint: &std::path::Path) -> RepositoryConfig {
    RepositoryConfig::FilesystemXfs(FilesystemXfsSpec {
        host: "localhost".into(),
        mountpoint: mountpoint.display().to_string(),
    })
}

const NFD_NAME: &str = "kilo\u{0301}metro.csv";
const NFC_NAME: &str = "kil\u{00f3}metro.csv";

#[test]
fn a_decomposed_filename_blocks_init_by_default() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join(NFD_NAME), b"42").unwrap();

    let err = init(&config, root.path(), "alice", "localhost", "first", false, false, &NoopProgressSink)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationBlocked);
    assert!(root.path().join(NFD_NAME).exists(), "force=false must not touch the filesystem");
}

#[test]
fn force_lets_a_decomposed_filename_through_unrenamed() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join(NFD_NAME), b"42").unwrap();

    let result = init(&config, root.path(), "alice", "localhost", "first", true, false, &NoopProgressSink)
        .unwrap();

    assert_eq!(result.entry_count, 1);
    assert!(root.path().join(NFD_NAME).exists(), "force does not imply normalize");
    assert!(!root.path().join(NFC_NAME).exists());
}

#[test]
fn normalize_repairs_the_filename_on_both_sides() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    std::fs::write(root.path().join(NFD_NAME), b"42").unwrap();

    let result = init(&config, root.path(), "alice", "localhost", "first", false, true, &NoopProgressSink)
        .unwrap();

    assert_eq!(result.entry_count, 1);
    assert!(!root.path().join(NFD_NAME).exists());
    assert!(root.path().join(NFC_NAME).exists());
    assert!(remote.path().join(NFC_NAME).exists());
}

#[test]
fn a_genuine_collision_after_normalization_is_still_blocked() {
    let root = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let config = local_config(remote.path());

    // Both the decomposed and precomposed forms exist: normalizing one
    // would collide with the other, so this must stay blocked even
    // with normalize=true.
    std::fs::write(root.path().join(NFD_NAME), b"42").unwrap();
    std::fs::write(root.path().join(NFC_NAME), b"43").unwrap();

    let err = init(&config, root.path(), "alice", "localhost", "first", false, true, &NoopProgressSink)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationBlocked);
}

//! Working-tree scanning: `scan(root, user_id, ignore, compute_hashes,
//! normalize) -> (Manifest, NormalizationReport)`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use super::errors::{ScanError, ScanResult, ScanWarning};
use super::ignore::IgnoreRules;
use super::normalize::{order_bottom_up, repair_component, NormalizationReport};
use crate::manifest::hash::xxh3_hex_reader;
use crate::manifest::{Entry, FileRef, LinkRef, Manifest, RepoPath};
use crate::repo_layout::META_DIR_NAME;

/// Scan `root`, producing a `Manifest` of everything retained plus a
/// report of anything the scanner had to flag (or, with
/// `normalize=true`, repair).
///
/// `compute_hashes=false` skips content hashing (used by callers that
/// only need size/mtime/path information, e.g. a quick `status` on a
/// large tree — the resulting `FileRef::hash` is empty in that case
/// and such a manifest must not be compared for content equality).
pub fn scan(
    root: &Path,
    user_id: &str,
    ignore: &IgnoreRules,
    compute_hashes: bool,
    normalize: bool,
) -> ScanResult<(Manifest, NormalizationReport)> {
    let mut report = NormalizationReport::default();
    let mut raw_entries: Vec<(String, RawKind)> = Vec::new();

    for dir_entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != root && !is_meta_dir(root, e.path()))
    {
        let dir_entry = match dir_entry {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                return Err(ScanError::io(path, io::Error::new(io::ErrorKind::Other, err.to_string())));
            }
        };

        let path = dir_entry.path();
        let file_type = dir_entry.file_type();

        if file_type.is_dir() {
            continue;
        }

        let rel = match path.strip_prefix(root) {
            Ok(r) => r,
            Err(_) => return Err(ScanError::escapes_root(path.to_path_buf())),
        };
        let rel_str = path_to_forward_slash(rel);
        let basename = dir_entry.file_name().to_string_lossy().to_string();

        if ignore.is_ignored(&rel_str, &basename) {
            continue;
        }

        if file_type.is_symlink() {
            match fs::read_link(path) {
                Ok(target) => {
                    raw_entries.push((rel_str, RawKind::Link(path_to_forward_slash(&target))));
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    report.warnings.push(ScanWarning::PermissionDenied { path: rel_str });
                }
                Err(e) => return Err(ScanError::io(path.to_path_buf(), e)),
            }
            continue;
        }

        if file_type.is_file() {
            raw_entries.push((rel_str, RawKind::File));
        }
    }

    // Validate / normalize paths before building entries.
    let mut rename_candidates: Vec<String> = Vec::new();
    for (rel_str, _) in &raw_entries {
        if !RepoPath::is_valid(rel_str) {
            if normalize {
                rename_candidates.push(rel_str.clone());
            } else {
                report.warnings.push(ScanWarning::InvalidPath {
                    path: rel_str.clone(),
                    reason: "fails NFC normalization or host path validation".to_string(),
                });
            }
        }
    }

    let mut rename_map: HashMap<String, String> = HashMap::new();
    if normalize && !rename_candidates.is_empty() {
        for original in order_bottom_up(rename_candidates) {
            let repaired = repair_path(&original);
            if repaired == original {
                continue;
            }
            let collides = raw_entries.iter().any(|(p, _)| {
                p != &original && (rename_map.get(p).cloned().unwrap_or_else(|| p.clone())) == repaired
            });
            if collides {
                report.warnings.push(ScanWarning::NormalizationCollision {
                    path: original.clone(),
                    colliding_with: repaired.clone(),
                });
                continue;
            }

            let from_disk = root.join(&original);
            let to_disk = root.join(&repaired);
            if let Some(parent) = to_disk.parent() {
                fs::create_dir_all(parent).map_err(|e| ScanError::io(parent.to_path_buf(), e))?;
            }
            fs::rename(&from_disk, &to_disk).map_err(|e| ScanError::io(from_disk.clone(), e))?;

            report.renames.push((original.clone(), repaired.clone()));
            rename_map.insert(original, repaired);
        }
    }

    let mut ordered: Vec<(RepoPath, Entry)> = Vec::with_capacity(raw_entries.len());
    for (rel_str, kind) in raw_entries {
        let final_rel = rename_map.get(&rel_str).cloned().unwrap_or(rel_str);
        let repo_path = match RepoPath::new(&final_rel) {
            Ok(p) => p,
            Err(_) => crate::manifest::RepoPath::new_unchecked(final_rel.clone()),
        };

        let entry = match kind {
            RawKind::Link(target) => Entry::Link(LinkRef::new(target, user_id)),
            RawKind::File => {
                let full_path = root.join(&final_rel);
                match build_file_ref(&full_path, user_id, compute_hashes) {
                    Ok(e) => e,
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                        report.warnings.push(ScanWarning::PermissionDenied { path: final_rel });
                        continue;
                    }
                    Err(e) => return Err(ScanError::io(full_path, e)),
                }
            }
        };

        ordered.push((repo_path, entry));
    }

    ordered.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

    Ok((Manifest::from_entries(ordered, None), report))
}

enum RawKind {
    File,
    Link(String),
}

fn build_file_ref(path: &Path, user_id: &str, compute_hashes: bool) -> io::Result<Entry> {
    let metadata = fs::metadata(path)?;
    let size = metadata.len();
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| {
            chrono::DateTime::<chrono::Utc>::from_timestamp(d.as_secs() as i64, 0)
                .unwrap_or_default()
                .to_rfc3339()
        })
        .unwrap_or_default();

    let hash = if compute_hashes {
        let file = fs::File::open(path)?;
        xxh3_hex_reader(file)?
    } else {
        String::new()
    };

    Ok(Entry::File(FileRef::new(size, mtime, hash, user_id)))
}

fn repair_path(rel: &str) -> String {
    rel.split('/')
        .map(repair_component)
        .collect::<Vec<_>>()
        .join("/")
}

fn path_to_forward_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_meta_dir(root: &Path, path: &Path) -> bool {
    path == root.join(META_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scans_files_and_symlinks() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"hello\n").unwrap();
        fs::create_dir(tmp.path().join("dir")).unwrap();
        fs::write(tmp.path().join("dir/b.txt"), b"world\n").unwrap();

        let (manifest, report) = scan(tmp.path(), "alice", &IgnoreRules::new(), true, false).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(report.is_clean());

        let entry = manifest.get(&RepoPath::new("a.txt").unwrap()).unwrap();
        assert_eq!(
            entry.as_file().unwrap().hash,
            crate::manifest::hash::xxh3_hex(b"hello\n")
        );
    }

    #[test]
    fn skips_reserved_metadata_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(META_DIR_NAME)).unwrap();
        fs::write(tmp.path().join(META_DIR_NAME).join("last-sync.json"), b"{}").unwrap();
        fs::write(tmp.path().join("a.txt"), b"hi\n").unwrap();

        let (manifest, _) = scan(tmp.path(), "alice", &IgnoreRules::new(), true, false).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn respects_ignore_rules() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.txt"), b"hi\n").unwrap();
        fs::write(tmp.path().join("skip.tmp"), b"hi\n").unwrap();

        let rules = IgnoreRules::new().with_suffix(".tmp");
        let (manifest, _) = scan(tmp.path(), "alice", &rules, true, false).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn flags_non_nfc_paths_without_normalize() {
        let tmp = TempDir::new().unwrap();
        let nfd_dir = "kilo\u{0301}metro";
        fs::create_dir(tmp.path().join(nfd_dir)).unwrap();
        fs::write(tmp.path().join(nfd_dir).join("data.csv"), b"x").unwrap();

        let (_, report) = scan(tmp.path(), "alice", &IgnoreRules::new(), true, false).unwrap();
        assert!(!report.is_clean());
        assert!(report.renames.is_empty());
    }

    #[test]
    fn repairs_non_nfc_paths_with_normalize() {
        let tmp = TempDir::new().unwrap();
        let nfd_dir = "kilo\u{0301}metro";
        fs::create_dir(tmp.path().join(nfd_dir)).unwrap();
        fs::write(tmp.path().join(nfd_dir).join("data.csv"), b"x").unwrap();

        let (manifest, report) = scan(tmp.path(), "alice", &IgnoreRules::new(), true, true).unwrap();
        assert_eq!(report.renames.len(), 1);
        let nfc_dir = "kil\u{00f3}metro";
        assert!(tmp.path().join(nfc_dir).join("data.csv").exists());
        assert!(manifest.contains(&RepoPath::new(&format!("{}/data.csv", nfc_dir)).unwrap()));
    }

    #[test]
    fn entries_are_sorted_by_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("z.txt"), b"z").unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();

        let (manifest, _) = scan(tmp.path(), "alice", &IgnoreRules::new(), true, false).unwrap();
        let paths: Vec<_> = manifest.paths().map(|p| p.as_str().to_string()).collect();
        assert_eq!(paths, vec!["a.txt".to_string(), "z.txt".to_string()]);
    }
}

//! Local advisory locking: a writer-exclusive lock on the repository's
//! metadata directory, held for the duration of a single sync.
//!
//! Per the concurrency model, this is the only coordination this crate
//! does on the client side — there is no cross-process coordination on
//! the remote, which instead relies on the commit-time
//! `RemoteMovedUnderneath` check.

mod errors;

pub use errors::{LockError, LockResult};

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::repo_layout;

/// A held advisory lock on `<root>/<meta>/lock`. Released automatically
/// on drop.
pub struct RepositoryLock {
    file: File,
}

impl RepositoryLock {
    /// Acquire the lock, blocking the caller until it's available. A
    /// single sync is a single blocking call, per the concurrency
    /// model's scheduling section — there are no cooperative yield
    /// points to expose here.
    pub fn acquire(root: &Path) -> LockResult<Self> {
        let meta_dir = repo_layout::meta_dir(root);
        fs::create_dir_all(&meta_dir)?;

        let path = repo_layout::lock_path(root);
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.lock_exclusive()
            .map_err(|e| LockError::acquire_failed(path.display().to_string(), e))?;
        Ok(Self { file })
    }

    /// Try to acquire without blocking; `Ok(None)` if another process
    /// already holds the lock.
    pub fn try_acquire(root: &Path) -> LockResult<Option<Self>> {
        let meta_dir = repo_layout::meta_dir(root);
        fs::create_dir_all(&meta_dir)?;

        let path = repo_layout::lock_path(root);
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(ref e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(LockError::acquire_failed(path.display().to_string(), e)),
        }
    }
}

impl Drop for RepositoryLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_try_acquire_fails_while_first_is_held() {
        let tmp = TempDir::new().unwrap();
        let first = RepositoryLock::acquire(tmp.path()).unwrap();
        let second = RepositoryLock::try_acquire(tmp.path()).unwrap();
        assert!(second.is_none());
        drop(first);
        assert!(RepositoryLock::try_acquire(tmp.path()).unwrap().is_some());
    }
}

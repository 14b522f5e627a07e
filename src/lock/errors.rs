//! Repository lock error type.

use std::fmt;
use std::io;

#[derive(Debug)]
pub struct LockError {
    message: String,
    source: Option<io::Error>,
}

impl LockError {
    pub fn acquire_failed(path: impl Into<String>, source: io::Error) -> Self {
        Self { message: format!("failed to acquire lock at {}", path.into()), source: Some(source) }
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for LockError {
    fn from(err: io::Error) -> Self {
        Self { message: "lock file I/O failure".to_string(), source: Some(err) }
    }
}

impl From<LockError> for crate::errors::DsgError {
    fn from(err: LockError) -> Self {
        crate::errors::DsgError::new(crate::errors::ErrorKind::Internal, err.message)
    }
}

pub type LockResult<T> = Result<T, LockError>;

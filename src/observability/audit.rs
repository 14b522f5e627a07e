//! Append-only audit logging for sync transactions.
//!
//! Every transaction attempt and its outcome is recorded durably so
//! that an operator can reconstruct what happened to a repository
//! without relying on in-memory state: each record is fsynced before
//! `append` returns.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use uuid::Uuid;

/// Audit action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// A sync transaction was opened.
    TransactionBegin,
    /// The remote side committed.
    RemoteCommit,
    /// The client side committed.
    ClientCommit,
    /// The transaction was rolled back before either side committed.
    TransactionRollback,
    /// The client commit did not succeed within the retry budget.
    ClientCommitExhausted,
    /// A path was left out of the plan as an unresolved conflict.
    ConflictRefused,
    /// The repository lock was acquired.
    LockAcquire,
    /// The repository lock was released.
    LockRelease,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TransactionBegin => "TRANSACTION_BEGIN",
            AuditAction::RemoteCommit => "REMOTE_COMMIT",
            AuditAction::ClientCommit => "CLIENT_COMMIT",
            AuditAction::TransactionRollback => "TRANSACTION_ROLLBACK",
            AuditAction::ClientCommitExhausted => "CLIENT_COMMIT_EXHAUSTED",
            AuditAction::ConflictRefused => "CONFLICT_REFUSED",
            AuditAction::LockAcquire => "LOCK_ACQUIRE",
            AuditAction::LockRelease => "LOCK_RELEASE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
    Pending,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "SUCCESS",
            AuditOutcome::Rejected => "REJECTED",
            AuditOutcome::Failed => "FAILED",
            AuditOutcome::Pending => "PENDING",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit record.
///
/// Every record carries the transaction it belongs to (when
/// applicable) so a full transaction history can be reconstructed by
/// filtering on `transaction_id`.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: SystemTime,
    pub action: AuditAction,
    /// Transaction this record belongs to, if any.
    pub transaction_id: Option<String>,
    /// Repository-relative path involved, if the action is path-scoped.
    pub path: Option<String>,
    /// `user_id` of the manifest side that triggered this action.
    pub user_id: Option<String>,
    pub outcome: AuditOutcome,
    pub error_message: Option<String>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, outcome: AuditOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
            action,
            transaction_id: None,
            path: None,
            user_id: None,
            outcome,
            error_message: None,
        }
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Serialize to a single JSON line, for append-only logging.
    pub fn to_json(&self) -> String {
        let timestamp = self
            .timestamp
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut json = format!(
            r#"{{"id":"{}","ts":{},"action":"{}","outcome":"{}""#,
            self.id, timestamp, self.action, self.outcome
        );

        if let Some(ref tid) = self.transaction_id {
            json.push_str(&format!(r#","transaction_id":"{}""#, escape_json(tid)));
        }
        if let Some(ref path) = self.path {
            json.push_str(&format!(r#","path":"{}""#, escape_json(path)));
        }
        if let Some(ref uid) = self.user_id {
            json.push_str(&format!(r#","user_id":"{}""#, escape_json(uid)));
        }
        if let Some(ref err) = self.error_message {
            json.push_str(&format!(r#","error":"{}""#, escape_json(err)));
        }

        json.push('}');
        json
    }
}

fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Audit log trait. `append` must be synchronous and durable: the
/// record must be visible on disk after the call returns.
pub trait AuditLog: Send + Sync {
    fn append(&self, record: &AuditRecord) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
}

/// File-based audit log: one JSON record per line, fsynced on every
/// append.
pub struct FileAuditLog {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl FileAuditLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        let json = record.to_json();
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    fn sync(&self) -> io::Result<()> {
        let writer = self.writer.lock().unwrap();
        writer.get_ref().sync_all()
    }
}

/// In-memory audit log, for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> io::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn audit_record_creation() {
        let record = AuditRecord::new(AuditAction::TransactionBegin, AuditOutcome::Pending)
            .with_transaction_id("txn-1")
            .with_user_id("alice");

        assert_eq!(record.action, AuditAction::TransactionBegin);
        assert_eq!(record.outcome, AuditOutcome::Pending);
        assert_eq!(record.transaction_id, Some("txn-1".to_string()));
    }

    #[test]
    fn audit_record_json() {
        let record = AuditRecord::new(AuditAction::ClientCommit, AuditOutcome::Success)
            .with_transaction_id("txn-2");

        let json = record.to_json();
        assert!(json.contains("CLIENT_COMMIT"));
        assert!(json.contains("SUCCESS"));
        assert!(json.contains("txn-2"));
    }

    #[test]
    fn memory_audit_log_preserves_order() {
        let log = MemoryAuditLog::new();

        let record1 = AuditRecord::new(AuditAction::TransactionBegin, AuditOutcome::Pending);
        let record2 = AuditRecord::new(AuditAction::ClientCommit, AuditOutcome::Success);

        log.append(&record1).unwrap();
        log.append(&record2).unwrap();

        assert_eq!(log.len(), 2);
        let records = log.records();
        assert_eq!(records[0].action, AuditAction::TransactionBegin);
        assert_eq!(records[1].action, AuditAction::ClientCommit);
    }

    #[test]
    fn file_audit_log_appends_durably() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");

        let log = FileAuditLog::open(&path).unwrap();

        let record = AuditRecord::new(AuditAction::RemoteCommit, AuditOutcome::Success)
            .with_path("notes/todo.md");

        log.append(&record).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("REMOTE_COMMIT"));
        assert!(contents.contains("notes/todo.md"));
    }

    #[test]
    fn escape_json_handles_special_characters() {
        assert_eq!(escape_json("hello"), "hello");
        assert_eq!(escape_json("hello\"world"), "hello\\\"world");
        assert_eq!(escape_json("line\nbreak"), "line\\nbreak");
    }
}

//! Observability subsystem: structured logging, counters, lifecycle
//! event tracing, and a durable audit log for sync transactions.
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes what a sync does.
//! 2. No async or background threads.
//! 3. Deterministic output: same inputs produce the same log bytes.
//!
//! # Usage
//!
//! ```ignore
//! use dsg::observability::{Logger, Event, metrics};
//!
//! Logger::info("TRANSACTION_BEGIN", &[("transaction_id", "abc123")]);
//!
//! metrics::global().increment_files_uploaded();
//! ```

mod events;
mod logger;
pub mod metrics;
pub mod audit;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use audit::{AuditRecord, AuditAction, AuditOutcome, AuditLog, FileAuditLog, MemoryAuditLog};

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservabilityErrorCode {
    ObservabilityFailed,
}

impl ObservabilityErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservabilityErrorCode::ObservabilityFailed => "DSG_OBSERVABILITY_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for ObservabilityErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Always `ObservabilityFailed`: logging/metrics/audit have one
/// failure mode, and it must never abort a sync.
#[derive(Debug)]
pub struct ObservabilityError {
    code: ObservabilityErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ObservabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: ObservabilityErrorCode::ObservabilityFailed,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: ObservabilityErrorCode::ObservabilityFailed,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn code(&self) -> ObservabilityErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Never fatal: a caller that gets one logs it and keeps syncing.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ObservabilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

pub fn log_event(event: Event) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), &[]);
}

pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

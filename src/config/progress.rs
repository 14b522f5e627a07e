//! `ProgressSink`: the narrow, non-blocking callback surface an
//! external progress-rendering collaborator implements. Per the
//! concurrency model, the engine makes no reentrancy guarantees and
//! callbacks must never block — a console implementation that wants to
//! redraw a terminal should queue the event and return immediately.

/// Which plan bucket an operation belongs to, labeling a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStep {
    Upload,
    Download,
    DeleteLocal,
    DeleteRemote,
    CacheRepair,
    CacheCleanup,
    ArchiveExchange,
}

/// One unit of plan application, identified for the progress sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLabel {
    pub step: OperationStep,
    /// The repository path, or an archive snapshot id for
    /// `ArchiveExchange`.
    pub subject: String,
}

impl OperationLabel {
    pub fn new(step: OperationStep, subject: impl Into<String>) -> Self {
        Self { step, subject: subject.into() }
    }
}

/// The outcome of one completed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Success,
    Failed(String),
}

/// Three non-blocking, non-reentrant callbacks, per §5: the caller is
/// notified of progress but the engine never waits on it.
pub trait ProgressSink {
    fn on_operation_start(&self, op: &OperationLabel, total: u64);
    fn on_operation_progress(&self, op: &OperationLabel, done: u64);
    fn on_operation_end(&self, op: &OperationLabel, result: &OperationOutcome);
}

/// A `ProgressSink` that does nothing, used when a caller (or a test)
/// has no interactive console to wire up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_operation_start(&self, _op: &OperationLabel, _total: u64) {}
    fn on_operation_progress(&self, _op: &OperationLabel, _done: u64) {}
    fn on_operation_end(&self, _op: &OperationLabel, _result: &OperationOutcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        events: RefCell<Vec<String>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_operation_start(&self, op: &OperationLabel, total: u64) {
            self.events.borrow_mut().push(format!("start:{}:{}", op.subject, total));
        }
        fn on_operation_progress(&self, op: &OperationLabel, done: u64) {
            self.events.borrow_mut().push(format!("progress:{}:{}", op.subject, done));
        }
        fn on_operation_end(&self, op: &OperationLabel, result: &OperationOutcome) {
            let tag = match result {
                OperationOutcome::Success => "ok",
                OperationOutcome::Failed(_) => "err",
            };
            self.events.borrow_mut().push(format!("end:{}:{}", op.subject, tag));
        }
    }

    #[test]
    fn sink_receives_events_in_order() {
        let sink = RecordingSink::default();
        let op = OperationLabel::new(OperationStep::Upload, "a.txt");
        sink.on_operation_start(&op, 100);
        sink.on_operation_progress(&op, 50);
        sink.on_operation_end(&op, &OperationOutcome::Success);
        assert_eq!(
            sink.events.into_inner(),
            vec!["start:a.txt:100", "progress:a.txt:50", "end:a.txt:ok"]
        );
    }

    #[test]
    fn noop_sink_accepts_calls_without_panicking() {
        let sink = NoopProgressSink;
        let op = OperationLabel::new(OperationStep::Download, "b.txt");
        sink.on_operation_start(&op, 1);
        sink.on_operation_end(&op, &OperationOutcome::Failed("x".into()));
    }
}

use std::sync::Mutex;

use tracing::warn;

use crate::app::ports::{FailureSinkPort, RecordFailure};

/// Default sink: one structured warning per skipped record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureSink;

impl FailureSinkPort for TracingFailureSink {
    fn report(&self, failure: RecordFailure) {
        warn!(
            id = %failure.id,
            stage = %failure.stage,
            "Error processing ID {}: {}",
            failure.id,
            failure.reason
        );
    }
}

/// Keeps every reported failure in memory, also forwarding to tracing.
#[derive(Debug, Default)]
pub struct CollectingFailureSink {
    failures: Mutex<Vec<RecordFailure>>,
}

impl CollectingFailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<RecordFailure> {
        self.failures
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.failures.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FailureSinkPort for CollectingFailureSink {
    fn report(&self, failure: RecordFailure) {
        TracingFailureSink.report(failure.clone());
        if let Ok(mut guard) = self.failures.lock() {
            guard.push(failure);
        }
    }
}

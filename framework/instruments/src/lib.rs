mod report;
mod reporter;

use std::time::{Duration, Instant};

pub use report::{AggregateReport, LatencySummary, OperationSummary};
pub use reporter::{ReportCollector, ReportConfig, Reporter};

pub mod prelude {
    pub use crate::report::{AggregateReport, LatencySummary, OperationSummary};
    pub use crate::reporter::{ReportCollector, ReportConfig, Reporter};
    pub use crate::{report_operation, OperationRecord};
}

/// The outcome of a single operation against the target service.
///
/// Created when the operation starts and completed exactly once with [OperationRecord::finish] or
/// [OperationRecord::finish_transport_error], after which it is handed to the [Reporter].
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub(crate) operation_id: String,
    started: Instant,
    pub(crate) elapsed: Option<Duration>,
    pub(crate) status: Option<u16>,
    pub(crate) is_error: bool,
    pub(crate) is_transport_error: bool,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            status: None,
            is_error: false,
            is_transport_error: false,
        }
    }

    /// Complete the record with the status the service answered with.
    pub fn finish(mut self, status: u16, success: bool, elapsed: Duration) -> Self {
        self.status = Some(status);
        self.is_error = !success;
        self.elapsed = Some(elapsed);
        self
    }

    /// Complete the record for a call that never produced an HTTP response.
    pub fn finish_transport_error(mut self) -> Self {
        self.status = None;
        self.is_error = true;
        self.is_transport_error = true;
        self.elapsed = Some(self.started.elapsed());
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_success(&self) -> bool {
        !self.is_error
    }

    pub fn is_transport_error(&self) -> bool {
        self.is_transport_error
    }

    /// Time taken by the operation. Falls back to the time since the record was created if the
    /// record was never finished.
    pub fn duration(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }
}

/// Finish `record` from `result` and hand it to the reporter.
///
/// `classify` decides whether a response counts as a success. An `Err` is recorded as a transport
/// error. Returns the duration that was recorded.
pub fn report_operation<T, E>(
    reporter: &Reporter,
    record: OperationRecord,
    result: &Result<T, E>,
    classify: impl FnOnce(&T) -> (u16, bool, Duration),
) -> Duration {
    let record = match result {
        Ok(response) => {
            let (status, success, elapsed) = classify(response);
            record.finish(status, success, elapsed)
        }
        Err(_) => record.finish_transport_error(),
    };

    let duration = record.duration();
    reporter.add_operation(record);
    duration
}

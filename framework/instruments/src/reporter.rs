mod in_memory_reporter;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::report::{AggregateReport, LatencyHistogram, OperationSummary};
use crate::OperationRecord;

pub use in_memory_reporter::InMemoryReporter;

/// Receives the final [AggregateReport] once the run is over.
pub trait ReportCollector: Send + Sync {
    fn finalize(&self, report: &AggregateReport);
}

/// Choose how the final report is presented.
#[derive(Default)]
pub struct ReportConfig {
    collectors: Vec<Box<dyn ReportCollector>>,
}

impl ReportConfig {
    /// Print a table summarising each operation when the run finishes.
    pub fn enable_summary(mut self) -> Self {
        self.collectors.push(Box::new(InMemoryReporter::new()));
        self
    }

    pub fn with_collector(mut self, collector: impl ReportCollector + 'static) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    pub fn init(self) -> Reporter {
        Reporter {
            operations: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            collectors: self.collectors,
        }
    }
}

#[derive(Debug, Default)]
struct OperationAccumulator {
    successes: u64,
    failures: u64,
    transport_errors: u64,
    status_counts: BTreeMap<u16, u64>,
    latency: LatencyHistogram,
}

impl OperationAccumulator {
    fn add(&mut self, record: &OperationRecord) {
        if record.is_error {
            self.failures += 1;
        } else {
            self.successes += 1;
        }
        if record.is_transport_error {
            self.transport_errors += 1;
        }
        if let Some(status) = record.status {
            *self.status_counts.entry(status).or_default() += 1;
        }
        self.latency.record(record.duration());
    }

    fn summarise(&self) -> OperationSummary {
        OperationSummary {
            attempts: self.successes + self.failures,
            successes: self.successes,
            failures: self.failures,
            transport_errors: self.transport_errors,
            status_counts: self.status_counts.clone(),
            latency: self.latency.summary(),
        }
    }
}

/// The result recorder shared by every agent in a run.
///
/// All updates go through one lock so a [Reporter::snapshot] never observes a half applied record.
/// Once [Reporter::finalize] has been called the reporter is closed and late records are dropped.
pub struct Reporter {
    operations: Mutex<HashMap<String, OperationAccumulator>>,
    closed: AtomicBool,
    attempts: AtomicU64,
    failures: AtomicU64,
    collectors: Vec<Box<dyn ReportCollector>>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("closed", &self.is_closed())
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

impl Reporter {
    pub fn add_operation(&self, record: OperationRecord) {
        log::trace!(
            "Operation {} took {}ms, status {:?}, error? {}",
            record.operation_id,
            record.duration().as_millis(),
            record.status,
            record.is_error,
        );

        let mut operations = self.operations.lock();
        // Checked under the lock so nothing lands after the final snapshot.
        if self.is_closed() {
            drop(operations);
            log::warn!(
                "Dropping operation record for {} received after the reporter was closed",
                record.operation_id
            );
            return;
        }

        operations
            .entry(record.operation_id.clone())
            .or_default()
            .add(&record);
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if record.is_error {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Attempts and failures across all operations, without taking the recorder lock.
    pub fn totals(&self) -> (u64, u64) {
        (
            self.attempts.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
        )
    }

    pub fn snapshot(&self) -> AggregateReport {
        let operations = self.operations.lock();
        AggregateReport {
            operations: operations
                .iter()
                .map(|(id, acc)| (id.clone(), acc.summarise()))
                .collect(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the reporter, hand the final report to every collector and return it.
    pub fn finalize(&self) -> AggregateReport {
        let report = {
            // Close while holding the lock so no record can land after the final snapshot.
            let operations = self.operations.lock();
            self.closed.store(true, Ordering::SeqCst);
            AggregateReport {
                operations: operations
                    .iter()
                    .map(|(id, acc)| (id.clone(), acc.summarise()))
                    .collect(),
            }
        };

        for collector in &self.collectors {
            collector.finalize(&report);
        }

        report
    }
}

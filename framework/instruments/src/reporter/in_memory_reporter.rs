mod operations_table;

use crate::report::AggregateReport;
use crate::reporter::in_memory_reporter::operations_table::OperationRow;
use crate::reporter::ReportCollector;
use tabled::settings::Style;
use tabled::Table;

/// Prints a summary table of every operation at the end of the run.
#[derive(Default)]
pub struct InMemoryReporter;

impl InMemoryReporter {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn summary_table(report: &AggregateReport) -> String {
        let ms = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());

        let rows = report
            .operations
            .iter()
            .map(|(operation_id, summary)| OperationRow {
                operation_id: operation_id.clone(),
                attempts: summary.attempts,
                successes: summary.successes,
                failures: summary.failures,
                transport_errors: summary.transport_errors,
                error_rate: summary.error_rate(),
                avg_time_ms: ms(summary.latency.as_ref().map(|l| l.mean_ms)),
                p95_time_ms: ms(summary.latency.as_ref().map(|l| l.p95_ms)),
                max_time_ms: ms(summary.latency.as_ref().map(|l| l.max_ms)),
            })
            .collect::<Vec<_>>();

        let mut table = Table::new(rows);
        table.with(Style::modern());
        table.to_string()
    }
}

impl ReportCollector for InMemoryReporter {
    fn finalize(&self, report: &AggregateReport) {
        println!("\nSummary of operations");
        println!("{}", Self::summary_table(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OperationRecord, ReportConfig};
    use std::time::Duration;

    #[test]
    fn table_lists_each_operation() {
        let reporter = ReportConfig::default().init();
        reporter.add_operation(OperationRecord::new("create-pr").finish(
            201,
            true,
            Duration::from_millis(12),
        ));
        reporter.add_operation(OperationRecord::new("get-review").finish_transport_error());

        let table = InMemoryReporter::summary_table(&reporter.snapshot());
        assert!(table.contains("create-pr"));
        assert!(table.contains("get-review"));
        assert!(table.contains("12.00"));
        assert!(table.contains("100.00%"));
    }
}

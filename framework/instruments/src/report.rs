use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Point in time view of everything recorded for a run, keyed by operation id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub operations: BTreeMap<String, OperationSummary>,
}

impl AggregateReport {
    pub fn get(&self, operation_id: &str) -> Option<&OperationSummary> {
        self.operations.get(operation_id)
    }

    /// Attempts recorded for `operation_id`, zero if the operation was never recorded.
    pub fn attempts(&self, operation_id: &str) -> u64 {
        self.get(operation_id).map(|s| s.attempts).unwrap_or_default()
    }

    pub fn total_attempts(&self) -> u64 {
        self.operations.values().map(|s| s.attempts).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.operations.values().map(|s| s.failures).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    /// Always `successes + failures`.
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// The subset of `failures` which never got an HTTP response.
    pub transport_errors: u64,
    /// Count of responses per HTTP status.
    pub status_counts: BTreeMap<u16, u64>,
    pub latency: Option<LatencySummary>,
}

impl OperationSummary {
    pub fn error_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.failures as f64 / self.attempts as f64
        }
    }
}

/// Latency statistics in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub total_ms: f64,
}

/// Largest latency the histogram tells apart, one hour. Slower calls are counted at this value.
const MAX_TRACKED_LATENCY_US: u64 = 3_600_000_000;

/// Latency samples for one operation, kept in constant memory.
///
/// Count, total, min and max are exact. Percentiles come from an HDR histogram with 3 significant
/// figures, clamped to the observed min and max.
#[derive(Debug, Clone)]
pub(crate) struct LatencyHistogram {
    histogram: Option<Histogram<u64>>,
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        let histogram = match Histogram::new_with_bounds(1, MAX_TRACKED_LATENCY_US, 3) {
            Ok(histogram) => Some(histogram),
            Err(e) => {
                log::warn!("Failed to create latency histogram, percentiles will not be reported: {e:?}");
                None
            }
        };

        Self {
            histogram,
            count: 0,
            total: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

impl LatencyHistogram {
    pub(crate) fn record(&mut self, latency: Duration) {
        if self.count == 0 || latency < self.min {
            self.min = latency;
        }
        if latency > self.max {
            self.max = latency;
        }
        self.count += 1;
        self.total += latency;

        if let Some(histogram) = self.histogram.as_mut() {
            // The lower bound is 1us
            histogram.saturating_record((latency.as_micros() as u64).max(1));
        }
    }

    pub(crate) fn summary(&self) -> Option<LatencySummary> {
        if self.count == 0 {
            return None;
        }

        let to_ms = |d: Duration| d.as_micros() as f64 / 1000.0;
        let min_ms = to_ms(self.min);
        let max_ms = to_ms(self.max);
        let mean_ms = to_ms(self.total) / self.count as f64;
        let quantile = |q: f64| match &self.histogram {
            Some(histogram) => {
                (histogram.value_at_quantile(q) as f64 / 1000.0).clamp(min_ms, max_ms)
            }
            None => mean_ms,
        };

        Some(LatencySummary {
            min_ms,
            mean_ms,
            p50_ms: quantile(0.50),
            p95_ms: quantile(0.95),
            p99_ms: quantile(0.99),
            max_ms,
            total_ms: to_ms(self.total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn histogram_of(durations: impl IntoIterator<Item = Duration>) -> LatencyHistogram {
        let mut histogram = LatencyHistogram::default();
        for duration in durations {
            histogram.record(duration);
        }
        histogram
    }

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() <= expected * 0.001,
            "Expected about {expected} but got {actual}"
        );
    }

    #[test]
    fn latency_summary_of_nothing() {
        assert_eq!(None, LatencyHistogram::default().summary());
    }

    #[test]
    fn latency_summary_of_many_samples() {
        let summary = histogram_of((1..=100).rev().map(Duration::from_millis))
            .summary()
            .unwrap();

        assert_eq!(1.0, summary.min_ms);
        assert_eq!(50.5, summary.mean_ms);
        assert_eq!(100.0, summary.max_ms);
        assert_eq!(5050.0, summary.total_ms);
        assert_close(50.0, summary.p50_ms);
        assert_close(95.0, summary.p95_ms);
        assert_close(99.0, summary.p99_ms);
    }

    #[test]
    fn single_sample_is_every_percentile() {
        let summary = histogram_of([Duration::from_millis(7)]).summary().unwrap();
        assert_eq!(7.0, summary.p50_ms);
        assert_eq!(7.0, summary.p99_ms);
        assert_eq!(summary.min_ms, summary.max_ms);
    }

    #[test]
    fn memory_does_not_grow_with_samples() {
        let mut histogram = LatencyHistogram::default();
        let buckets = histogram.histogram.as_ref().unwrap().distinct_values();
        for n in 0..200_000u64 {
            histogram.record(Duration::from_micros(n % 5_000 + 1));
        }

        assert_eq!(buckets, histogram.histogram.as_ref().unwrap().distinct_values());
        let summary = histogram.summary().unwrap();
        assert_eq!(0.001, summary.min_ms);
        assert_eq!(5.0, summary.max_ms);
        assert_close(2.5, summary.p50_ms);
    }

    #[test]
    fn zero_and_huge_latencies_are_counted() {
        let summary = histogram_of([Duration::ZERO, Duration::from_secs(2 * 3600)])
            .summary()
            .unwrap();
        assert_eq!(0.0, summary.min_ms);
        assert_eq!(7_200_000.0, summary.max_ms);
    }

    #[test]
    fn error_rate() {
        let summary = OperationSummary {
            attempts: 4,
            successes: 3,
            failures: 1,
            ..Default::default()
        };
        assert_eq!(0.25, summary.error_rate());
        assert_eq!(0.0, OperationSummary::default().error_rate());
    }
}

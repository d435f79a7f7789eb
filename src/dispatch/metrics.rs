//! # Dispatch Metrics
//!
//! Latency sink interface used by branch executors, plus the in-process
//! statistics keeper and in-flight gauge the coordinator uses by default.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Collector of per-call latency samples
pub trait MetricsSink: Send + Sync {
    fn record_sample(&self, elapsed: Duration);
}

/// Sink that discards every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetricsSink;

impl MetricsSink for NoOpMetricsSink {
    fn record_sample(&self, _elapsed: Duration) {}
}

/// Point-in-time view of recorded latencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min: Option<Duration>,
    pub max: Option<Duration>,
    pub total: Duration,
}

impl LatencySummary {
    /// Mean sample, or `None` before the first sample
    pub fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    fn add(&mut self, sample: Duration) {
        self.count += 1;
        self.total = self.total.saturating_add(sample);
        self.min = Some(self.min.map_or(sample, |min| min.min(sample)));
        self.max = Some(self.max.map_or(sample, |max| max.max(sample)));
    }
}

/// Statistics keeper accumulating count, min, max and total latency
#[derive(Debug, Default)]
pub struct LatencyStatistics {
    summary: Mutex<LatencySummary>,
}

impl LatencyStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LatencySummary {
        *self.summary.lock()
    }

    pub fn reset(&self) {
        *self.summary.lock() = LatencySummary::default();
    }
}

impl MetricsSink for LatencyStatistics {
    fn record_sample(&self, elapsed: Duration) {
        self.summary.lock().add(elapsed);
    }
}

/// Gauge of branches currently executing their downstream call
#[derive(Debug, Default)]
pub struct InFlightGauge {
    value: AtomicI64,
}

impl InFlightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increase(&self) {
        self.value.fetch_add(1, Ordering::AcqRel);
    }

    pub fn decrease(&self) {
        self.value.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}

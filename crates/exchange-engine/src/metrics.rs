//! Metrics for the exchange engine.
//!
//! Hand-rolled atomic counters rather than the `metrics` crate: these
//! are read on every admission inside a book's critical section, and
//! the engine would rather not take on a global recorder's dispatch
//! overhead there. HTTP-layer metrics (request counts, latencies) use
//! `observability::ServerMetrics` instead, which does use `metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct Histogram {
    count: AtomicU64,
    sum: AtomicU64,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0),
        }
    }

    pub fn record(&self, value_us: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value_us, Ordering::Relaxed);
    }

    pub fn avg_us(&self) -> u64 {
        let count = self.count.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        if count > 0 {
            sum / count
        } else {
            0
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide exchange metrics, shared across all books.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
    pub orders_admitted: Counter,
    pub orders_rejected: Counter,
    pub trades_executed: Counter,
    pub cancellations: Counter,
    pub admission_latency: Histogram,
}

impl ExchangeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_admission(&self, duration: Duration) {
        self.orders_admitted.increment();
        self.admission_latency.record(duration.as_micros() as u64);
    }

    pub fn record_rejection(&self) {
        self.orders_rejected.increment();
    }

    pub fn record_trade(&self) {
        self.trades_executed.increment();
    }

    pub fn record_cancellation(&self) {
        self.cancellations.increment();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            orders_admitted: self.orders_admitted.get(),
            orders_rejected: self.orders_rejected.get(),
            trades_executed: self.trades_executed.get(),
            cancellations: self.cancellations.get(),
            admission_latency_avg_us: self.admission_latency.avg_us(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub orders_admitted: u64,
    pub orders_rejected: u64,
    pub trades_executed: u64,
    pub cancellations: u64,
    pub admission_latency_avg_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let metrics = ExchangeMetrics::new();
        assert_eq!(metrics.snapshot().orders_admitted, 0);
        metrics.record_admission(Duration::from_micros(10));
        assert_eq!(metrics.snapshot().orders_admitted, 1);
    }
}

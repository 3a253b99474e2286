//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

use crate::batch::BatchOutcome;

/// Ingestion metrics shared by every request handler
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Requests whose payload decoded
    pub batches_received: AtomicU64,

    /// Requests that could not be decoded
    pub decode_errors: AtomicU64,

    /// Decoded requests yielding zero events
    pub empty_batches: AtomicU64,

    /// Events handed to the dispatcher
    pub events_accepted: AtomicU64,

    /// Raw entries dropped before dispatch
    pub records_rejected: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decoded batch
    pub fn record_batch(&self, outcome: &BatchOutcome) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        if outcome.is_empty() {
            self.empty_batches.fetch_add(1, Ordering::Relaxed);
        }
        self.events_accepted
            .fetch_add(outcome.events.len() as u64, Ordering::Relaxed);
        self.records_rejected
            .fetch_add(outcome.rejected.len() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches_received: u64,
    pub decode_errors: u64,
    pub empty_batches: u64,
    pub events_accepted: u64,
    pub records_rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::process_batch;
    use serde_json::json;

    #[test]
    fn test_record_batch() {
        let metrics = IngestionMetrics::new();
        let outcome = process_batch(&json!([{}, {"date_time": "bad"}, 3])).unwrap();
        metrics.record_batch(&outcome);
        metrics.record_batch(&process_batch(&json!([])).unwrap());
        metrics.record_decode_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_received, 2);
        assert_eq!(snap.empty_batches, 1);
        assert_eq!(snap.events_accepted, 1);
        assert_eq!(snap.records_rejected, 2);
        assert_eq!(snap.decode_errors, 1);
    }
}

//! Shard metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single shard
#[derive(Debug, Default)]
pub struct ShardMetrics {
    /// Events stored on the first or a retried attempt
    stored_count: AtomicU64,
    /// Writes confirmed by a duplicate-key signal
    duplicate_count: AtomicU64,
    /// Failover attempts after the first write failed
    retry_count: AtomicU64,
    /// Events given up on
    abandoned_count: AtomicU64,
}

impl ShardMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_count(&self) -> u64 {
        self.stored_count.load(Ordering::Relaxed)
    }

    pub fn inc_stored_count(&self) {
        self.stored_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn duplicate_count(&self) -> u64 {
        self.duplicate_count.load(Ordering::Relaxed)
    }

    pub fn inc_duplicate_count(&self) {
        self.duplicate_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub fn inc_retry_count(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn abandoned_count(&self) -> u64 {
        self.abandoned_count.load(Ordering::Relaxed)
    }

    pub fn inc_abandoned_count(&self) {
        self.abandoned_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            stored_count: self.stored_count(),
            duplicate_count: self.duplicate_count(),
            retry_count: self.retry_count(),
            abandoned_count: self.abandoned_count(),
        }
    }
}

/// Snapshot of shard metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub stored_count: u64,
    pub duplicate_count: u64,
    pub retry_count: u64,
    pub abandoned_count: u64,
}

impl MetricsSnapshot {
    /// Writes that reached a terminal state
    pub fn completed(&self) -> u64 {
        self.stored_count + self.duplicate_count + self.abandoned_count
    }
}

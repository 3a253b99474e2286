//! In-flight write tracking for graceful shutdown

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

/// Counter of write tasks that have not reached a terminal outcome
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    inner: Arc<Inner>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one write; it stays in flight until the guard drops
    pub fn track(&self) -> InFlightGuard {
        let count = self.inner.count.fetch_add(1, Ordering::AcqRel) + 1;
        observability::record_in_flight(count);
        InFlightGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Resolve once no write is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait up to `timeout` for writes to finish, returning how many are left
    pub async fn drain(&self, timeout: Duration) -> usize {
        let _ = tokio::time::timeout(timeout, self.wait_idle()).await;
        self.count()
    }
}

/// Marks one write as in flight
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let remaining = self.inner.count.fetch_sub(1, Ordering::AcqRel) - 1;
        observability::record_in_flight(remaining);
        if remaining == 0 {
            self.inner.idle.notify_waiters();
        }
    }
}

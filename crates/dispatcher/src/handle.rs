//! ShardHandle - one backend with its name and counters

use std::sync::Arc;

use contracts::{ShardBackend, ShardName};

use crate::metrics::ShardMetrics;

/// Shared handle to a shard backend
pub struct ShardHandle<B> {
    name: ShardName,
    backend: Arc<B>,
    metrics: Arc<ShardMetrics>,
}

impl<B: ShardBackend> ShardHandle<B> {
    /// Wrap a backend, naming the shard after it
    pub fn new(backend: B) -> Self {
        let name = ShardName::new(backend.name());
        Self {
            name,
            backend: Arc::new(backend),
            metrics: Arc::new(ShardMetrics::new()),
        }
    }
}

impl<B> ShardHandle<B> {
    pub fn name(&self) -> &ShardName {
        &self.name
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn metrics(&self) -> &Arc<ShardMetrics> {
        &self.metrics
    }
}

impl<B> Clone for ShardHandle<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            backend: Arc::clone(&self.backend),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B> std::fmt::Debug for ShardHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardHandle")
            .field("name", &self.name)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

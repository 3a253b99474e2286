//! Dispatcher - routes events to shards and writes each one in its own task

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    DeadLetterConfig, Event, EventId, FailoverConfig, ServiceBlueprint, ShardBackend, ShardConfig,
    ShardName,
};

use crate::backends::AnyBackend;
use crate::dead_letter::{DeadLetter, DeadLetterStore};
use crate::error::DispatcherError;
use crate::handle::ShardHandle;
use crate::in_flight::InFlight;
use crate::metrics::MetricsSnapshot;
use crate::router;
use crate::writer::{DurableWriter, FailoverPolicy, WriteOutcome};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Shard configurations, in routing order
    pub shards: Vec<ShardConfig>,
    pub failover: FailoverConfig,
    pub dead_letter: DeadLetterConfig,
}

impl DispatcherConfig {
    pub fn from_blueprint(blueprint: &ServiceBlueprint) -> Self {
        Self {
            shards: blueprint.shards.clone(),
            failover: blueprint.failover.clone(),
            dead_letter: blueprint.dead_letter.clone(),
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Open every backend and the dead-letter store
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher<AnyBackend>, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;
        let dead_letters = DeadLetterStore::open(self.config.dead_letter.path.as_deref())
            .await?
            .with_recent_limit(self.config.dead_letter.recent_limit);
        let writer = DurableWriter::new(FailoverPolicy::from(&self.config.failover));

        Dispatcher::new(handles, writer, dead_letters)
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(shard_count = config.shards.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<ShardHandle<AnyBackend>>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.shards.len());
        for shard_config in &config.shards {
            let backend = AnyBackend::from_config(shard_config).await?;
            handles.push(ShardHandle::new(backend));
        }
        Ok(handles)
    }
}

/// Events spawned but not yet at a terminal outcome, with their shard index
type Pending = Mutex<HashMap<EventId, (usize, Event)>>;

/// Routes events over a fixed shard set.
///
/// Cloning is cheap; clones share shards, counters and the dead-letter store.
pub struct Dispatcher<B> {
    shards: Arc<[ShardHandle<B>]>,
    writer: Arc<DurableWriter>,
    dead_letters: Arc<DeadLetterStore>,
    in_flight: InFlight,
    pending: Arc<Pending>,
}

impl<B> Clone for Dispatcher<B> {
    fn clone(&self) -> Self {
        Self {
            shards: Arc::clone(&self.shards),
            writer: Arc::clone(&self.writer),
            dead_letters: Arc::clone(&self.dead_letters),
            in_flight: self.in_flight.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<B> Dispatcher<B> {
    /// Create a dispatcher over an ordered, non-empty shard set
    pub fn new(
        handles: Vec<ShardHandle<B>>,
        writer: DurableWriter,
        dead_letters: DeadLetterStore,
    ) -> Result<Self, DispatcherError> {
        if handles.is_empty() {
            return Err(DispatcherError::NoShards);
        }
        Ok(Self {
            shards: handles.into(),
            writer: Arc::new(writer),
            dead_letters: Arc::new(dead_letters),
            in_flight: InFlight::new(),
            pending: Arc::default(),
        })
    }

    /// Create a dispatcher with default failover and in-memory dead letters
    pub fn with_handles(handles: Vec<ShardHandle<B>>) -> Result<Self, DispatcherError> {
        Self::new(handles, DurableWriter::default(), DeadLetterStore::in_memory())
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shards(&self) -> &[ShardHandle<B>] {
        &self.shards
    }

    pub fn shard_names(&self) -> Vec<ShardName> {
        self.shards.iter().map(|h| h.name().clone()).collect()
    }

    /// Shard owning the event's transaction id
    pub fn route(&self, event: &Event) -> Result<&ShardHandle<B>, DispatcherError> {
        let index = router::route(event, self.shards.len())?;
        self.shards.get(index).ok_or(DispatcherError::NoShards)
    }

    /// Get metrics for all shards
    pub fn metrics(&self) -> Vec<(ShardName, MetricsSnapshot)> {
        self.shards
            .iter()
            .map(|h| (h.name().clone(), h.metrics().snapshot()))
            .collect()
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterStore> {
        &self.dead_letters
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Wait up to `grace` for in-flight writes, returning how many were left.
    ///
    /// Events still unwritten when the grace period ends are recorded as dead
    /// letters with zero attempts. A write that lands afterwards leaves a
    /// letter whose replay is rejected as a duplicate.
    #[instrument(name = "dispatcher_drain", skip(self))]
    pub async fn drain(&self, grace: Duration) -> usize {
        let pending = self.in_flight.count();
        if pending > 0 {
            info!(pending, "Waiting for in-flight writes");
        }

        let remaining = self.in_flight.drain(grace).await;
        if remaining == 0 {
            debug!("All writes drained");
            return 0;
        }

        let unfinished: Vec<(usize, Event)> = lock_pending(&self.pending)
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        warn!(
            remaining,
            dead_lettered = unfinished.len(),
            "Shutdown grace elapsed, dead-lettering unfinished writes"
        );
        for (index, event) in unfinished {
            self.dead_letters
                .record(DeadLetter::unfinished(self.shards[index].name(), event))
                .await;
        }
        remaining
    }
}

impl<B: ShardBackend + Send + Sync + 'static> Dispatcher<B> {
    /// Route each event and write it on its own task.
    ///
    /// Returns as soon as the tasks are spawned; callers that need the
    /// outcome await the handles.
    #[instrument(name = "dispatcher_dispatch", skip(self, events), fields(events = events.len()))]
    pub fn dispatch(
        &self,
        events: Vec<Event>,
    ) -> Result<Vec<JoinHandle<WriteOutcome>>, DispatcherError> {
        let mut tasks = Vec::with_capacity(events.len());

        for event in events {
            let index = router::route(&event, self.shards.len())?;
            let guard = self.in_flight.track();
            let shards = Arc::clone(&self.shards);
            let writer = Arc::clone(&self.writer);
            let dead_letters = Arc::clone(&self.dead_letters);
            let pending = Arc::clone(&self.pending);
            lock_pending(&pending).insert(event.id, (index, event.clone()));

            tasks.push(tokio::spawn(async move {
                let _guard = guard;
                let shard = &shards[index];
                let outcome = writer.write(shard, &event).await;
                lock_pending(&pending).remove(&event.id);

                if let WriteOutcome::Abandoned { attempts, error } = &outcome {
                    error!(
                        shard = %shard.name(),
                        event_id = %event.id,
                        transaction_id = %event.transaction_id,
                        attempts,
                        error = %error,
                        "Event abandoned"
                    );
                    dead_letters
                        .record(DeadLetter::new(shard.name(), event, *attempts, error))
                        .await;
                }
                outcome
            }));
        }

        Ok(tasks)
    }
}

fn lock_pending(pending: &Pending) -> std::sync::MutexGuard<'_, HashMap<EventId, (usize, Event)>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Convenience function to create a dispatcher from a blueprint
#[instrument(name = "dispatcher_create", skip(blueprint))]
pub async fn create_dispatcher(
    blueprint: &ServiceBlueprint,
) -> Result<Dispatcher<AnyBackend>, DispatcherError> {
    DispatcherBuilder::new(DispatcherConfig::from_blueprint(blueprint))
        .build()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use crate::dead_letter::UNFINISHED_AT_SHUTDOWN;
    use crate::test_support::sample_event;
    use contracts::{BackendType, InsertError};
    use std::collections::HashMap;

    struct RejectingBackend;

    impl ShardBackend for RejectingBackend {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn insert_unique(&self, _event: &Event) -> Result<(), InsertError> {
            Err(InsertError::rejected("read-only"))
        }
    }

    /// Never completes a write
    struct StalledBackend;

    impl ShardBackend for StalledBackend {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn insert_unique(&self, _event: &Event) -> Result<(), InsertError> {
            std::future::pending().await
        }
    }

    fn memory_shards(names: &[&str]) -> Vec<ShardHandle<MemoryBackend>> {
        names
            .iter()
            .map(|name| ShardHandle::new(MemoryBackend::new(*name)))
            .collect()
    }

    async fn await_all(tasks: Vec<JoinHandle<WriteOutcome>>) -> Vec<WriteOutcome> {
        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }
        outcomes
    }

    #[tokio::test]
    async fn test_events_land_on_routed_shard() {
        let dispatcher =
            Dispatcher::with_handles(memory_shards(&["db_1", "db_2", "db_3"])).unwrap();
        let events: Vec<Event> = (0..30).map(|i| sample_event(&format!("tx-{i}"))).collect();

        let expected: Vec<(String, _)> = events
            .iter()
            .map(|e| (dispatcher.route(e).unwrap().name().to_string(), e.id))
            .collect();

        let outcomes = await_all(dispatcher.dispatch(events).unwrap()).await;
        assert!(outcomes.iter().all(WriteOutcome::is_success));

        for (shard_name, id) in expected {
            let shard = dispatcher
                .shards()
                .iter()
                .find(|h| h.name().as_str() == shard_name)
                .unwrap();
            assert!(shard.backend().get(&id).is_some());
        }

        let stored: u64 = dispatcher.metrics().iter().map(|(_, m)| m.stored_count).sum();
        assert_eq!(stored, 30);
        assert_eq!(dispatcher.in_flight().count(), 0);
    }

    #[tokio::test]
    async fn test_same_key_same_shard() {
        let dispatcher = Dispatcher::with_handles(memory_shards(&["a", "b", "c", "d"])).unwrap();
        let first = sample_event("abc123");
        let second = sample_event("abc123");
        assert_eq!(
            dispatcher.route(&first).unwrap().name(),
            dispatcher.route(&second).unwrap().name()
        );
    }

    #[tokio::test]
    async fn test_abandoned_event_goes_to_dead_letters() {
        let dispatcher =
            Dispatcher::with_handles(vec![ShardHandle::new(RejectingBackend)]).unwrap();
        let event = sample_event("abc123");
        let id = event.id;

        let outcomes = await_all(dispatcher.dispatch(vec![event]).unwrap()).await;

        assert!(!outcomes[0].is_success());
        let letters = dispatcher.dead_letters().entries();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].event.id, id);
        assert_eq!(letters[0].shard, "rejecting");
        assert_eq!(dispatcher.metrics()[0].1.abandoned_count, 1);
    }

    #[tokio::test]
    async fn test_empty_shard_set_rejected() {
        let result = Dispatcher::<MemoryBackend>::with_handles(Vec::new());
        assert!(matches!(result, Err(DispatcherError::NoShards)));
    }

    #[tokio::test]
    async fn test_drain_after_dispatch() {
        let dispatcher = Dispatcher::with_handles(memory_shards(&["db_1"])).unwrap();
        let tasks = dispatcher
            .dispatch((0..5).map(|i| sample_event(&i.to_string())).collect())
            .unwrap();
        assert_eq!(tasks.len(), 5);

        assert_eq!(dispatcher.drain(Duration::from_secs(5)).await, 0);
        assert_eq!(dispatcher.metrics()[0].1.stored_count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfinished_writes_dead_lettered_after_grace() {
        let dispatcher =
            Dispatcher::with_handles(vec![ShardHandle::new(StalledBackend)]).unwrap();
        let event = sample_event("abc123");
        let id = event.id;

        let _tasks = dispatcher.dispatch(vec![event]).unwrap();
        assert_eq!(dispatcher.drain(Duration::from_secs(10)).await, 1);

        let letters = dispatcher.dead_letters().entries();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].event.id, id);
        assert_eq!(letters[0].shard, "stalled");
        assert_eq!(letters[0].attempts, 0);
        assert_eq!(letters[0].error, UNFINISHED_AT_SHUTDOWN);
    }

    #[tokio::test]
    async fn test_completed_writes_leave_nothing_pending() {
        let dispatcher = Dispatcher::with_handles(memory_shards(&["db_1", "db_2"])).unwrap();
        let tasks = dispatcher
            .dispatch((0..4).map(|i| sample_event(&i.to_string())).collect())
            .unwrap();
        await_all(tasks).await;

        assert!(lock_pending(&dispatcher.pending).is_empty());
        assert_eq!(dispatcher.drain(Duration::from_secs(1)).await, 0);
        assert!(dispatcher.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_blueprint() {
        let blueprint = ServiceBlueprint {
            version: Default::default(),
            server: Default::default(),
            failover: Default::default(),
            dead_letter: Default::default(),
            shards: vec![
                ShardConfig {
                    name: "database_1".to_string(),
                    backend_type: BackendType::Memory,
                    params: HashMap::new(),
                },
                ShardConfig {
                    name: "database_2".to_string(),
                    backend_type: BackendType::Log,
                    params: HashMap::new(),
                },
            ],
        };

        let dispatcher = create_dispatcher(&blueprint).await.unwrap();
        assert_eq!(dispatcher.shard_count(), 2);
        assert_eq!(
            dispatcher.shard_names(),
            vec![ShardName::new("database_1"), ShardName::new("database_2")]
        );

        let outcomes = await_all(dispatcher.dispatch(vec![sample_event("k")]).unwrap()).await;
        assert!(outcomes[0].is_success());
    }
}

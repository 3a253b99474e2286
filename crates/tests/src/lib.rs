//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - Payload to acknowledgement to stored documents
//! - HTTP ingress through the full router
//! - Failover against a backend that is temporarily down
//! - Persistence of file-backed shards and dead letters

#[cfg(test)]
mod support {
    use std::path::Path;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Event, ServiceBlueprint};
    use dispatcher::{AnyBackend, Dispatcher};

    pub fn memory_blueprint(shards: usize) -> ServiceBlueprint {
        let mut toml = String::new();
        for i in 1..=shards {
            toml.push_str(&format!(
                "[[shards]]\nname = \"database_{i}\"\nbackend_type = \"memory\"\n\n"
            ));
        }
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    pub fn file_blueprint(dir: &Path, shards: usize) -> ServiceBlueprint {
        let mut toml = format!(
            "[dead_letter]\npath = \"{}\"\n\n",
            dir.join("dead_letters.jsonl").display()
        );
        for i in 1..=shards {
            toml.push_str(&format!(
                "[[shards]]\nname = \"database_{i}\"\nbackend_type = \"file\"\n\
                 [shards.params]\npath = \"{}\"\n\n",
                dir.join(format!("database_{i}.jsonl")).display()
            ));
        }
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    /// Documents per shard, in routing order
    pub fn memory_documents(dispatcher: &Dispatcher<AnyBackend>) -> Vec<Vec<Event>> {
        dispatcher
            .shards()
            .iter()
            .map(|shard| shard.backend().as_memory().unwrap().documents())
            .collect()
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{EventType, IngestAck};
    use dispatcher::{create_dispatcher, shard_for_key};
    use transport::IngestService;

    use crate::support::{memory_blueprint, memory_documents};

    const GRACE: Duration = Duration::from_secs(5);

    /// Submit a body and wait for every write it spawned
    async fn submit(service: &IngestService<dispatcher::AnyBackend>, body: &str) -> IngestAck {
        let ack = service.submit(Some("application/json"), body.as_bytes());
        assert_eq!(service.dispatcher().drain(GRACE).await, 0);
        ack
    }

    #[tokio::test]
    async fn test_click_lands_on_routed_shard() {
        let dispatcher = create_dispatcher(&memory_blueprint(3)).await.unwrap();
        let service = IngestService::new(dispatcher.clone());

        let ack = submit(
            &service,
            r#"[{"event_type":"Click","transaction_id":"abc123","user_id":"U1",
                 "date_time":"2024-05-01 10:00:00","time_to_click":4.2}]"#,
        )
        .await;
        assert_eq!(ack, IngestAck::success(1));

        let documents = memory_documents(&dispatcher);
        let target = shard_for_key("abc123", 3).unwrap();
        for (index, shard) in documents.iter().enumerate() {
            assert_eq!(shard.len(), usize::from(index == target));
        }

        let event = &documents[target][0];
        assert_eq!(event.event_type, EventType::Click);
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.transaction_id, "abc123");
        assert!(event.ad_type.is_none());
        assert_eq!(event.time_to_click.as_ref().unwrap().as_f64(), Some(4.2));
    }

    #[tokio::test]
    async fn test_empty_list_writes_nothing() {
        let dispatcher = create_dispatcher(&memory_blueprint(2)).await.unwrap();
        let service = IngestService::new(dispatcher.clone());

        let ack = submit(&service, "[]").await;

        assert_eq!(ack, IngestAck::empty());
        assert!(memory_documents(&dispatcher).iter().all(Vec::is_empty));
        assert_eq!(service.metrics().snapshot().empty_batches, 1);
    }

    #[tokio::test]
    async fn test_empty_object_gets_defaults() {
        let dispatcher = create_dispatcher(&memory_blueprint(2)).await.unwrap();
        let service = IngestService::new(dispatcher.clone());

        let ack = submit(&service, "{}").await;
        assert_eq!(ack, IngestAck::success(1));

        let stored: Vec<_> = memory_documents(&dispatcher).into_iter().flatten().collect();
        assert_eq!(stored.len(), 1);
        let event = &stored[0];
        assert_eq!(event.event_type, EventType::Undetected);
        assert!(!event.user_id.is_empty());
        assert!(!event.transaction_id.is_empty());
        assert!(event.time_to_click.is_none());
    }

    #[tokio::test]
    async fn test_routing_ignores_case() {
        let dispatcher = create_dispatcher(&memory_blueprint(4)).await.unwrap();
        let service = IngestService::new(dispatcher.clone());

        let ack = submit(
            &service,
            r#"[{"transaction_id":"Tx-Mixed"},{"transaction_id":"  tx-mixed "}]"#,
        )
        .await;
        assert_eq!(ack, IngestAck::success(2));

        let documents = memory_documents(&dispatcher);
        let target = shard_for_key("tx-mixed", 4).unwrap();
        assert_eq!(documents[target].len(), 2);
        assert!(documents[target]
            .iter()
            .all(|event| event.transaction_id == "tx-mixed"));
    }

    #[tokio::test]
    async fn test_bad_records_are_skipped() {
        let dispatcher = create_dispatcher(&memory_blueprint(2)).await.unwrap();
        let service = IngestService::new(dispatcher.clone());

        let ack = submit(
            &service,
            r#"[{"date_time":"yesterday"},{"event_type":"impression"},{"date_time":"2024-13-40"}]"#,
        )
        .await;
        assert_eq!(ack, IngestAck::success(1));

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.events_accepted, 1);
        assert_eq!(snapshot.records_rejected, 2);
        let total: usize = memory_documents(&dispatcher).iter().map(Vec::len).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let dispatcher = create_dispatcher(&memory_blueprint(1)).await.unwrap();
        let service = IngestService::new(dispatcher.clone());

        assert_eq!(submit(&service, "{oops").await, IngestAck::not_valid_json());
        assert_eq!(submit(&service, "42").await, IngestAck::not_valid_json());
        assert_eq!(
            service.submit(Some("text/plain"), b"{}"),
            IngestAck::not_valid_json()
        );
        assert!(memory_documents(&dispatcher)[0].is_empty());
    }
}

#[cfg(test)]
mod http_tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use dispatcher::create_dispatcher;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use transport::{router, IngestService};

    use crate::support::{memory_blueprint, memory_documents};

    #[tokio::test]
    async fn test_post_events_end_to_end() {
        let blueprint = memory_blueprint(3);
        let dispatcher = create_dispatcher(&blueprint).await.unwrap();
        let app = router(
            IngestService::new(dispatcher.clone()),
            blueprint.server.max_body_bytes,
        );

        let body = json!([
            {"event_type": "impression", "transaction_id": "t1"},
            {"event_type": "click", "transaction_id": "t2"},
            {"event_type": "completion", "transaction_id": "t3"}
        ]);
        let response = app
            .oneshot(
                Request::post("/events")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let ack: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ack, json!({"status": "success", "received": 3}));

        assert_eq!(dispatcher.drain(Duration::from_secs(5)).await, 0);
        let total: usize = memory_documents(&dispatcher).iter().map(Vec::len).sum();
        assert_eq!(total, 3);
    }
}

#[cfg(test)]
mod failover_tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use contracts::{Event, IngestAck, InsertError, ShardBackend};
    use dispatcher::{DeadLetterStore, Dispatcher, DurableWriter, FailoverPolicy, ShardHandle};
    use transport::IngestService;

    /// Backend that is down for the first `outage` inserts
    struct OutageBackend {
        outage: AtomicU32,
        calls: AtomicU32,
        stored: Mutex<HashSet<contracts::EventId>>,
    }

    impl OutageBackend {
        fn new(outage: u32) -> Self {
            Self {
                outage: AtomicU32::new(outage),
                calls: AtomicU32::new(0),
                stored: Mutex::new(HashSet::new()),
            }
        }

        fn ids(&self) -> HashSet<contracts::EventId> {
            self.stored.lock().unwrap().clone()
        }
    }

    impl ShardBackend for OutageBackend {
        fn name(&self) -> &str {
            "database_1"
        }

        async fn insert_unique(&self, event: &Event) -> Result<(), InsertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let down = self
                .outage
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if down {
                return Err(InsertError::unavailable("connection refused"));
            }
            if !self.stored.lock().unwrap().insert(event.id) {
                return Err(InsertError::duplicate(event.id));
            }
            Ok(())
        }
    }

    fn policy(max_rounds: Option<u32>) -> FailoverPolicy {
        FailoverPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            round_pause: Duration::from_secs(1),
            max_rounds,
        }
    }

    fn service(outage: u32, max_rounds: Option<u32>) -> IngestService<OutageBackend> {
        let dispatcher = Dispatcher::new(
            vec![ShardHandle::new(OutageBackend::new(outage))],
            DurableWriter::new(policy(max_rounds)),
            DeadLetterStore::in_memory(),
        )
        .unwrap();
        IngestService::new(dispatcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_recovers_with_single_document() {
        let service = service(3, Some(2));

        let ack = service.submit(Some("application/json"), br#"{"transaction_id":"abc123"}"#);
        assert_eq!(ack, IngestAck::success(1));
        assert_eq!(service.dispatcher().drain(Duration::from_secs(600)).await, 0);

        let shard = &service.dispatcher().shards()[0];
        assert_eq!(shard.backend().ids().len(), 1);
        assert_eq!(shard.backend().calls.load(Ordering::SeqCst), 4);

        let metrics = shard.metrics().snapshot();
        assert_eq!(metrics.stored_count, 1);
        assert_eq!(metrics.retry_count, 3);
        assert!(service.dispatcher().dead_letters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_outage_dead_letters_event() {
        let service = service(u32::MAX, Some(2));

        let ack = service.submit(Some("application/json"), br#"[{"transaction_id":"lost"}]"#);
        assert_eq!(ack, IngestAck::success(1));
        assert_eq!(service.dispatcher().drain(Duration::from_secs(600)).await, 0);

        let dispatcher = service.dispatcher();
        assert!(dispatcher.shards()[0].backend().ids().is_empty());
        assert_eq!(dispatcher.shards()[0].metrics().abandoned_count(), 1);

        let letters = dispatcher.dead_letters().entries();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].event.transaction_id, "lost");
        assert_eq!(letters[0].attempts, 7);
    }
}

#[cfg(test)]
mod persistence_tests {
    use std::time::Duration;

    use contracts::{IngestAck, InsertError, ShardName};
    use dispatcher::{create_dispatcher, shard_for_key, DeadLetter, DeadLetterStore, FileBackend};
    use tempfile::tempdir;
    use transport::IngestService;

    use crate::support::file_blueprint;

    #[tokio::test]
    async fn test_file_shards_survive_restart() {
        let dir = tempdir().unwrap();
        let blueprint = file_blueprint(dir.path(), 2);

        let dispatcher = create_dispatcher(&blueprint).await.unwrap();
        let service = IngestService::new(dispatcher.clone());
        let ack = service.submit(
            Some("application/json"),
            br#"[{"transaction_id":"a"},{"transaction_id":"b"},{"transaction_id":"c"}]"#,
        );
        assert_eq!(ack, IngestAck::success(3));
        assert_eq!(dispatcher.drain(Duration::from_secs(5)).await, 0);
        drop(service);
        drop(dispatcher);

        let mut per_shard = [0usize; 2];
        for key in ["a", "b", "c"] {
            per_shard[shard_for_key(key, 2).unwrap()] += 1;
        }

        for (index, shard) in blueprint.shards.iter().enumerate() {
            let reopened = FileBackend::from_params(&shard.name, &shard.params)
                .await
                .unwrap();
            assert_eq!(reopened.len().await, per_shard[index]);
        }
    }

    #[tokio::test]
    async fn test_dead_letters_written_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dead_letters.jsonl");

        let store = DeadLetterStore::open(Some(&path)).await.unwrap();
        let event = ingestion::normalize(
            serde_json::json!({"transaction_id": "gone"})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        store
            .record(DeadLetter::new(
                &ShardName::new("database_1"),
                event,
                60,
                &InsertError::unavailable("timeout"),
            ))
            .await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let line: DeadLetter = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(line.event.transaction_id, "gone");
        assert_eq!(line.attempts, 60);
        assert_eq!(store.len(), 1);
    }
}

//! # Dispatcher
//!
//! Event routing and durable writes.
//!
//! Responsibilities:
//! - Route each `Event` to one shard by its `transaction_id`
//! - Write every event on its own task, retrying while the shard is unavailable
//! - Record abandoned events in the dead-letter store
//! - Track in-flight writes for graceful shutdown

pub mod backends;
pub mod dead_letter;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod in_flight;
pub mod metrics;
pub mod router;
pub mod writer;

pub use backends::{AnyBackend, FileBackend, FileBackendConfig, LogBackend, MemoryBackend};
pub use contracts::{Event, ShardBackend};
pub use dead_letter::{DeadLetter, DeadLetterStore};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::ShardHandle;
pub use in_flight::{InFlight, InFlightGuard};
pub use metrics::{MetricsSnapshot, ShardMetrics};
pub use router::{route, shard_for_key, stable_hash};
pub use writer::{DurableWriter, FailoverPolicy, WriteOutcome};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use contracts::{Event, EventType};
    use uuid::Uuid;

    pub fn sample_event(transaction_id: &str) -> Event {
        Event {
            id: Uuid::new_v4(),
            event_type: EventType::Click,
            user_id: "user-1".to_string(),
            transaction_id: transaction_id.to_string(),
            ad_type: None,
            date_time: Utc::now(),
            time_to_click: None,
        }
    }
}

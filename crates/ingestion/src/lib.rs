//! # Ingestion
//!
//! Event normalization module.
//!
//! Responsibilities:
//! - Accept a decoded payload (single record or list of records)
//! - Normalize each raw record into a canonical `Event`
//! - Report rejected entries with their position and reason
//!
//! ## Usage Example
//!
//! ```
//! use ingestion::process_batch;
//! use serde_json::json;
//!
//! let outcome = process_batch(&json!([{"event_type": "Click", "transaction_id": "abc123"}])).unwrap();
//! assert_eq!(outcome.events.len(), 1);
//! assert_eq!(outcome.events[0].transaction_id, "abc123");
//! ```

mod batch;
mod datetime;
mod error;
mod metrics;
mod normalizer;

// Re-exports
pub use batch::{process_batch, BatchOutcome, RejectReason, Rejection};
pub use contracts::{Event, RawRecord};
pub use datetime::{parse_event_time, parse_lenient, parse_strict, STRICT_FORMAT};
pub use error::{IngestionError, NormalizationError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use normalizer::{normalize, normalize_at, normalize_key};

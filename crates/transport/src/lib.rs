//! # Transport
//!
//! HTTP ingress for the ingest pipeline.
//!
//! ## Endpoint
//!
//! ```text
//! POST /events
//! Content-Type: application/json
//!
//! [{"event_type":"Click","transaction_id":"abc123"}]
//! ```
//!
//! Answers `{"status":"success","received":N}`, `{"status":"error"}` when
//! nothing usable was submitted, or `{"status":"error","details":"not valid json"}`
//! when the body could not be decoded.

mod error;
mod routes;
mod server;
mod service;

pub use error::TransportError;
pub use routes::router;
pub use server::{bind, serve, shutdown_signal};
pub use service::{is_json_content_type, IngestService};

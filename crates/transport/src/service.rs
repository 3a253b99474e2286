//! IngestService - payload to acknowledgement
//!
//! Decodes a request body, normalizes it and hands the events to the
//! dispatcher. The acknowledgement is returned once writes are spawned,
//! not once they are stored.

use std::sync::Arc;

use contracts::{IngestAck, ShardBackend};
use dispatcher::Dispatcher;
use ingestion::{process_batch, BatchOutcome, IngestionMetrics};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

/// Content types accepted for decoding
const JSON_CONTENT_TYPE: &str = "application/json";

/// True when the header value names JSON (parameters such as charset allowed)
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        ct.trim_start()
            .get(..JSON_CONTENT_TYPE.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(JSON_CONTENT_TYPE))
    })
}

/// Shared ingest entry point
pub struct IngestService<B> {
    dispatcher: Dispatcher<B>,
    metrics: Arc<IngestionMetrics>,
}

impl<B> Clone for IngestService<B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B> IngestService<B> {
    pub fn new(dispatcher: Dispatcher<B>) -> Self {
        Self {
            dispatcher,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }
}

impl<B: ShardBackend + Send + Sync + 'static> IngestService<B> {
    /// Handle one submission
    #[instrument(
        name = "transport_submit",
        skip(self, body),
        fields(bytes = body.len())
    )]
    pub fn submit(&self, content_type: Option<&str>, body: &[u8]) -> IngestAck {
        let ack = self.process(content_type, body);
        observability::record_request(ack.status());
        ack
    }

    fn process(&self, content_type: Option<&str>, body: &[u8]) -> IngestAck {
        let Some(outcome) = self.decode(content_type, body) else {
            self.metrics.record_decode_error();
            return IngestAck::not_valid_json();
        };

        self.metrics.record_batch(&outcome);
        observability::record_batch(outcome.total(), outcome.events.len());
        for rejection in &outcome.rejected {
            observability::record_record_rejected(rejection.reason.label());
        }

        if outcome.is_empty() {
            debug!(
                rejected = outcome.rejected.len(),
                "Payload produced no events"
            );
            return IngestAck::empty();
        }

        let received = outcome.events.len();
        match self.dispatcher.dispatch(outcome.events) {
            Ok(_tasks) => IngestAck::success(received),
            Err(e) => {
                error!(error = %e, events = received, "Dispatch failed");
                IngestAck::not_dispatched()
            }
        }
    }

    fn decode(&self, content_type: Option<&str>, body: &[u8]) -> Option<BatchOutcome> {
        if !is_json_content_type(content_type) {
            debug!(content_type = ?content_type, "Unsupported content type");
            return None;
        }

        let payload: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Body is not valid JSON");
                return None;
            }
        };

        match process_batch(&payload) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Unsupported payload shape");
                None
            }
        }
    }
}

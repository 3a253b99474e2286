//! Batch processing
//!
//! Accepts the permissive "single record or list of records" payload shape
//! and normalizes every entry in order.

use contracts::Event;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::error::{IngestionError, NormalizationError, Result};
use crate::normalizer::normalize;

/// Why a raw entry produced no event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Array entry that is not a JSON object (including `null`)
    NotAnObject,
    /// Entry failed normalization
    Normalization(NormalizationError),
}

impl RejectReason {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::Normalization(e) => e.reason(),
        }
    }
}

/// One skipped entry of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Position in the submitted payload
    pub index: usize,
    pub reason: RejectReason,
}

/// Result of normalizing one payload
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Events in input order
    pub events: Vec<Event>,
    pub rejected: Vec<Rejection>,
}

impl BatchOutcome {
    /// Number of raw entries seen
    pub fn total(&self) -> usize {
        self.events.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Normalize a decoded payload.
///
/// `null` and `[]` yield an empty outcome.
///
/// # Errors
/// Returns `UnsupportedPayload` for scalar payloads.
#[instrument(name = "ingestion_process_batch", skip(payload))]
pub fn process_batch(payload: &Value) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();

    match payload {
        Value::Null => {}
        Value::Object(_) => push_entry(&mut outcome, 0, payload),
        Value::Array(entries) => {
            outcome.events.reserve(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                push_entry(&mut outcome, index, entry);
            }
        }
        Value::Bool(_) => return Err(IngestionError::UnsupportedPayload { found: "boolean" }),
        Value::Number(_) => return Err(IngestionError::UnsupportedPayload { found: "number" }),
        Value::String(_) => return Err(IngestionError::UnsupportedPayload { found: "string" }),
    }

    Ok(outcome)
}

fn push_entry(outcome: &mut BatchOutcome, index: usize, entry: &Value) {
    let Value::Object(raw) = entry else {
        outcome.rejected.push(Rejection {
            index,
            reason: RejectReason::NotAnObject,
        });
        return;
    };

    match normalize(raw) {
        Ok(event) => outcome.events.push(event),
        Err(e) => {
            warn!(index, error = %e, "record rejected during normalization");
            outcome.rejected.push(Rejection {
                index,
                reason: RejectReason::Normalization(e),
            });
        }
    }
}

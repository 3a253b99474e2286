//! IngestAck - response returned to the transport for one request

use serde::{Deserialize, Serialize};

/// Details text for payloads that could not be decoded.
pub const NOT_VALID_JSON: &str = "not valid json";

/// Details text when decoded events could not be handed to the shards.
pub const NOT_DISPATCHED: &str = "events not dispatched";

/// Acknowledgement of a submitted batch.
///
/// `Success` means the events were accepted into the pipeline, not that
/// they are durably stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestAck {
    Success {
        received: usize,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl IngestAck {
    pub fn success(received: usize) -> Self {
        Self::Success { received }
    }

    /// Payload decoded but produced no events
    pub fn empty() -> Self {
        Self::Error { details: None }
    }

    /// Payload could not be decoded
    pub fn not_valid_json() -> Self {
        Self::Error {
            details: Some(NOT_VALID_JSON.to_string()),
        }
    }

    /// Events decoded but could not be dispatched
    pub fn not_dispatched() -> Self {
        Self::Error {
            details: Some(NOT_DISPATCHED.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Status label for logs and metrics
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Error { details: None } => "empty",
            Self::Error { details: Some(d) } if d == NOT_VALID_JSON => "invalid",
            Self::Error { details: Some(_) } => "failed",
        }
    }
}

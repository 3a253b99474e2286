//! Ingestion error types

use thiserror::Error;

/// Per-record normalization failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// `date_time` present but no parser accepts it
    #[error("unparseable date_time value: {value}")]
    UnparseableDate {
        /// Offending raw value, as JSON text
        value: String,
    },
}

impl NormalizationError {
    pub fn unparseable_date(value: impl Into<String>) -> Self {
        Self::UnparseableDate {
            value: value.into(),
        }
    }

    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnparseableDate { .. } => "unparseable_date",
        }
    }
}

/// Whole-payload failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestionError {
    /// Payload is neither an object nor an array of objects
    #[error("unsupported payload: expected object or array, got {found}")]
    UnsupportedPayload {
        /// JSON type name of the payload
        found: &'static str,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;

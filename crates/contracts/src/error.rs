//! Layered error definitions
//!
//! Categorized by source: config / backend / io

use thiserror::Error;

/// Unified error type for configuration and backend construction
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Backend Errors =====
    /// Shard backend could not be opened
    #[error("shard '{shard}' backend error: {message}")]
    Backend { shard: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create backend construction error
    pub fn backend(shard: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            shard: shard.into(),
            message: message.into(),
        }
    }
}

/// Outcome signal of a single unique-key insert.
///
/// Only `Unavailable` is transient; the writer retries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    /// A document with the same id is already stored
    #[error("duplicate key '{id}'")]
    Duplicate { id: String },

    /// Backend temporarily unreachable (reconnecting, I/O failure)
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    /// Backend refuses this document permanently
    #[error("document rejected: {message}")]
    Rejected { message: String },
}

impl InsertError {
    pub fn duplicate(id: impl ToString) -> Self {
        Self::Duplicate { id: id.to_string() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

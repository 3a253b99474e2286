//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Routing over an empty shard set
    #[error("no shards configured")]
    NoShards,

    /// Backend creation error
    #[error("failed to create backend '{name}': {message}")]
    BackendCreation { name: String, message: String },

    /// Dead-letter store could not be opened
    #[error("dead-letter store '{path}' unavailable: {source}")]
    DeadLetter {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a backend creation error
    pub fn backend_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn dead_letter(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::DeadLetter {
            path: path.into(),
            source,
        }
    }
}

//! Transport error types

use thiserror::Error;

/// HTTP listener errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server stopped with an I/O failure
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl TransportError {
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }
}

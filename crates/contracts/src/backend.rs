//! ShardBackend trait - Dispatcher egress interface
//!
//! Abstract document store owning one shard of the event space.

use crate::{Event, InsertError};

/// Unique-key document store.
///
/// Implementations are shared by many concurrent write tasks, so every
/// method takes `&self`.
#[trait_variant::make(ShardBackend: Send)]
pub trait LocalShardBackend {
    /// Backend name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Insert the event keyed by its id.
    ///
    /// # Errors
    /// - `Duplicate` when a document with the same id exists
    /// - `Unavailable` for transient failures worth retrying
    /// - `Rejected` when the document can never be stored
    async fn insert_unique(&self, event: &Event) -> Result<(), InsertError>;
}

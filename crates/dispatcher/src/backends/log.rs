//! LogBackend - logs documents via tracing

use contracts::{Event, InsertError, ShardBackend};
use tracing::{info, instrument};

/// Backend that only logs each document, for debugging
pub struct LogBackend {
    name: String,
}

impl LogBackend {
    /// Create a new LogBackend with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_document(&self, event: &Event) -> Result<(), InsertError> {
        let document =
            serde_json::to_string(event).map_err(|e| InsertError::rejected(e.to_string()))?;

        info!(
            shard = %self.name,
            event_id = %event.id,
            event_type = %event.event_type,
            document = %document,
            "Event received"
        );
        Ok(())
    }
}

impl ShardBackend for LogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_backend_insert",
        skip(self, event),
        fields(shard = %self.name, event_id = %event.id)
    )]
    async fn insert_unique(&self, event: &Event) -> Result<(), InsertError> {
        self.log_document(event)
    }
}

//! MemoryBackend - process-local document map

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{Event, EventId, InsertError, ShardBackend};

/// Backend holding documents in a map keyed by event id
#[derive(Debug)]
pub struct MemoryBackend {
    name: String,
    documents: Mutex<HashMap<EventId, Event>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &EventId) -> Option<Event> {
        self.lock().get(id).cloned()
    }

    /// Every stored document, in no particular order
    pub fn documents(&self) -> Vec<Event> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventId, Event>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ShardBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_unique(&self, event: &Event) -> Result<(), InsertError> {
        let mut documents = self.lock();
        if documents.contains_key(&event.id) {
            return Err(InsertError::duplicate(event.id));
        }
        documents.insert(event.id, event.clone());
        Ok(())
    }
}

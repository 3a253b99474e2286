//! Shard backend implementations
//!
//! Contains MemoryBackend, FileBackend and LogBackend, plus `AnyBackend` for
//! shard sets built from configuration.

mod file;
mod log;
mod memory;

use contracts::{BackendType, Event, InsertError, ShardBackend, ShardConfig};
use tracing::instrument;

use crate::error::DispatcherError;

pub use self::file::{FileBackend, FileBackendConfig};
pub use self::log::LogBackend;
pub use self::memory::MemoryBackend;

/// Backend selected per shard by `backend_type`
pub enum AnyBackend {
    Memory(MemoryBackend),
    File(FileBackend),
    Log(LogBackend),
}

impl AnyBackend {
    /// Create a backend from shard configuration
    #[instrument(
        name = "backend_from_config",
        skip(config),
        fields(shard = %config.name, backend_type = ?config.backend_type)
    )]
    pub async fn from_config(config: &ShardConfig) -> Result<Self, DispatcherError> {
        match config.backend_type {
            BackendType::Memory => Ok(Self::Memory(MemoryBackend::new(&config.name))),
            BackendType::Log => Ok(Self::Log(LogBackend::new(&config.name))),
            BackendType::File => FileBackend::from_params(&config.name, &config.params)
                .await
                .map(Self::File)
                .map_err(|e| match e {
                    DispatcherError::BackendCreation { .. } => e,
                    other => DispatcherError::backend_creation(&config.name, other.to_string()),
                }),
        }
    }

    pub fn as_memory(&self) -> Option<&MemoryBackend> {
        match self {
            Self::Memory(backend) => Some(backend),
            _ => None,
        }
    }
}

impl ShardBackend for AnyBackend {
    fn name(&self) -> &str {
        match self {
            Self::Memory(backend) => backend.name(),
            Self::File(backend) => backend.name(),
            Self::Log(backend) => backend.name(),
        }
    }

    async fn insert_unique(&self, event: &Event) -> Result<(), InsertError> {
        match self {
            Self::Memory(backend) => backend.insert_unique(event).await,
            Self::File(backend) => backend.insert_unique(event).await,
            Self::Log(backend) => backend.insert_unique(event).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn shard(
        name: &str,
        backend_type: BackendType,
        params: HashMap<String, String>,
    ) -> ShardConfig {
        ShardConfig {
            name: name.to_string(),
            backend_type,
            params,
        }
    }

    #[tokio::test]
    async fn test_from_config_each_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.jsonl").display().to_string();

        let memory = AnyBackend::from_config(&shard("m", BackendType::Memory, HashMap::new()))
            .await
            .unwrap();
        assert!(memory.as_memory().is_some());
        assert_eq!(memory.name(), "m");

        let log = AnyBackend::from_config(&shard("l", BackendType::Log, HashMap::new()))
            .await
            .unwrap();
        assert!(matches!(log, AnyBackend::Log(_)));

        let params = HashMap::from([("path".to_string(), path)]);
        let file = AnyBackend::from_config(&shard("f", BackendType::File, params))
            .await
            .unwrap();
        assert!(matches!(file, AnyBackend::File(_)));
        assert_eq!(file.name(), "f");
    }

    #[tokio::test]
    async fn test_file_without_path_fails() {
        let result = AnyBackend::from_config(&shard("f", BackendType::File, HashMap::new())).await;
        match result {
            Err(DispatcherError::BackendCreation { name, .. }) => assert_eq!(name, "f"),
            _ => panic!("expected BackendCreation error"),
        }
    }
}

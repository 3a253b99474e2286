//! Dead-letter store for abandoned events
//!
//! Keeps the most recent abandoned events in memory and, when a path is
//! configured, appends every one as a JSON line to a file for replay.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use contracts::{Event, InsertError, ShardName};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, instrument};

use crate::error::DispatcherError;

/// One abandoned event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub shard: String,
    pub attempts: u32,
    pub error: String,
    pub abandoned_at: DateTime<Utc>,
    pub event: Event,
}

/// Error text of letters recorded because shutdown cut the write short
pub const UNFINISHED_AT_SHUTDOWN: &str = "write unfinished at shutdown";

impl DeadLetter {
    pub fn new(shard: &ShardName, event: Event, attempts: u32, error: &InsertError) -> Self {
        Self {
            shard: shard.to_string(),
            attempts,
            error: error.to_string(),
            abandoned_at: Utc::now(),
            event,
        }
    }

    /// Event whose write was still running when the shutdown grace elapsed
    pub fn unfinished(shard: &ShardName, event: Event) -> Self {
        Self {
            shard: shard.to_string(),
            attempts: 0,
            error: UNFINISHED_AT_SHUTDOWN.to_string(),
            abandoned_at: Utc::now(),
            event,
        }
    }
}

/// Letters kept in memory when no limit is configured
pub const DEFAULT_RECENT_LIMIT: usize = 1_000;

#[derive(Debug, Default)]
struct Recent {
    letters: VecDeque<DeadLetter>,
    /// Every letter ever recorded, including evicted ones
    recorded: usize,
}

/// Append-only record of abandoned events
#[derive(Debug)]
pub struct DeadLetterStore {
    recent: Mutex<Recent>,
    recent_limit: usize,
    file: Option<tokio::sync::Mutex<File>>,
    path: Option<PathBuf>,
}

impl Default for DeadLetterStore {
    fn default() -> Self {
        Self {
            recent: Mutex::default(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            file: None,
            path: None,
        }
    }
}

impl DeadLetterStore {
    /// Memory-only store
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store, appending to `path` when given
    #[instrument(name = "dead_letter_open", skip(path))]
    pub async fn open(path: Option<&Path>) -> Result<Self, DispatcherError> {
        let Some(path) = path else {
            return Ok(Self::in_memory());
        };

        let display = path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DispatcherError::dead_letter(&display, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| DispatcherError::dead_letter(&display, e))?;

        Ok(Self {
            file: Some(tokio::sync::Mutex::new(file)),
            path: Some(path.to_path_buf()),
            ..Self::default()
        })
    }

    /// Keep at most `limit` letters in memory (at least one)
    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.max(1);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    /// Record an abandoned event.
    ///
    /// File failures are logged. The in-memory window always takes the
    /// letter, evicting the oldest once full.
    pub async fn record(&self, letter: DeadLetter) {
        if let Some(file) = &self.file {
            match serde_json::to_string(&letter) {
                Ok(mut line) => {
                    line.push('\n');
                    let mut file = file.lock().await;
                    if let Err(e) = file.write_all(line.as_bytes()).await {
                        error!(
                            event_id = %letter.event.id,
                            error = %e,
                            "Failed to append dead letter"
                        );
                    } else if let Err(e) = file.flush().await {
                        error!(error = %e, "Failed to flush dead-letter file");
                    }
                }
                Err(e) => {
                    error!(event_id = %letter.event.id, error = %e, "Dead letter not serializable");
                }
            }
        }

        let mut recent = self.lock_recent();
        if recent.letters.len() >= self.recent_limit {
            recent.letters.pop_front();
        }
        recent.letters.push_back(letter);
        recent.recorded += 1;
    }

    /// Letters recorded since start, including ones no longer in memory
    pub fn len(&self) -> usize {
        self.lock_recent().recorded
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Letters evicted from the in-memory window
    pub fn evicted(&self) -> usize {
        let recent = self.lock_recent();
        recent.recorded - recent.letters.len()
    }

    /// Copy of the letters still in memory, oldest first
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.lock_recent().letters.iter().cloned().collect()
    }

    fn lock_recent(&self) -> std::sync::MutexGuard<'_, Recent> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

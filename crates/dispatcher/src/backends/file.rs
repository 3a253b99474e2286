//! FileBackend - append-only JSONL document store
//!
//! One document per line. The id index is rebuilt from the file on open, so
//! duplicate detection survives restarts. A failed append is cut back to the
//! last complete line before anything else is written.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use contracts::{Event, EventId, InsertError, ShardBackend};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::DispatcherError;

/// Configuration for FileBackend
#[derive(Debug, Clone)]
pub struct FileBackendConfig {
    /// JSONL file holding this shard's documents
    pub path: PathBuf,
}

impl FileBackendConfig {
    /// Create config from params map
    pub fn from_params(
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let path = params
            .get("path")
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DispatcherError::backend_creation(name, "missing 'path' parameter"))?;

        Ok(Self {
            path: PathBuf::from(path),
        })
    }
}

/// File operations the backend relies on
trait ShardFile {
    /// Write every byte; on error an unknown prefix may have landed
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
    async fn sync(&mut self) -> io::Result<()>;
    async fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl ShardFile for File {
    async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes).await?;
        // tokio buffers the write; errors surface on flush
        self.flush().await
    }

    async fn sync(&mut self) -> io::Result<()> {
        self.sync_data().await
    }

    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

struct FileState<F = File> {
    file: F,
    ids: HashSet<EventId>,
    /// Length of the file up to the last complete line
    committed_len: u64,
    /// Bytes past `committed_len` from a failed append
    torn: bool,
}

impl<F: ShardFile> FileState<F> {
    fn new(file: F, ids: HashSet<EventId>, committed_len: u64) -> Self {
        Self {
            file,
            ids,
            committed_len,
            torn: false,
        }
    }

    /// Append one newline-terminated document.
    ///
    /// The id is recorded once the whole line is written, so a retry after a
    /// failed sync reports `Duplicate` instead of appending the line again.
    async fn insert(&mut self, id: EventId, line: &[u8]) -> Result<(), InsertError> {
        if self.ids.contains(&id) {
            return Err(InsertError::duplicate(id));
        }

        self.repair().await?;

        if let Err(e) = self.file.append(line).await {
            self.torn = true;
            if let Err(repair_err) = self.repair().await {
                warn!(error = %repair_err, "Partial line left in shard file");
            }
            return Err(InsertError::unavailable(e.to_string()));
        }

        self.committed_len += line.len() as u64;
        self.ids.insert(id);

        self.file.sync().await.map_err(|e| {
            warn!(event_id = %id, error = %e, "Document written but not synced");
            InsertError::unavailable(e.to_string())
        })
    }

    /// Cut a torn tail back to the last complete line
    async fn repair(&mut self) -> Result<(), InsertError> {
        if !self.torn {
            return Ok(());
        }
        self.file
            .truncate(self.committed_len)
            .await
            .map_err(|e| InsertError::unavailable(e.to_string()))?;
        self.torn = false;
        Ok(())
    }
}

/// Backend appending documents to a JSONL file
pub struct FileBackend {
    name: String,
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileBackend {
    /// Open (or create) the shard file and index the ids already in it
    #[instrument(
        name = "file_backend_open",
        skip(name, config),
        fields(path = %config.path.display())
    )]
    pub async fn open(
        name: impl Into<String>,
        config: FileBackendConfig,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let path = config.path;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = load_contents(&path).await?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        if contents.committed_len < contents.file_len {
            warn!(
                shard = %name,
                bytes = contents.file_len - contents.committed_len,
                "Truncating partial line at end of shard file"
            );
            file.set_len(contents.committed_len).await?;
        }

        debug!(shard = %name, documents = contents.ids.len(), "FileBackend opened");

        Ok(Self {
            name,
            path,
            state: Mutex::new(FileState::new(file, contents.ids, contents.committed_len)),
        })
    }

    /// Create from params map (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let config = FileBackendConfig::from_params(&name, params)?;
        Self::open(name, config).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of documents stored
    pub async fn len(&self) -> usize {
        self.state.lock().await.ids.len()
    }

    pub async fn contains(&self, id: &EventId) -> bool {
        self.state.lock().await.ids.contains(id)
    }
}

struct ShardContents {
    ids: HashSet<EventId>,
    committed_len: u64,
    file_len: u64,
}

/// Index the ids of every complete document already in the file
async fn load_contents(path: &Path) -> io::Result<ShardContents> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };

    let committed = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos + 1);

    let mut ids = HashSet::new();
    for (line_no, line) in bytes[..committed].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match document_id(line) {
            Some(id) => {
                ids.insert(id);
            }
            None => warn!(
                path = %path.display(),
                line = line_no + 1,
                "Skipping unreadable document line"
            ),
        }
    }

    Ok(ShardContents {
        ids,
        committed_len: committed as u64,
        file_len: bytes.len() as u64,
    })
}

fn document_id(line: &[u8]) -> Option<EventId> {
    let value: serde_json::Value = serde_json::from_slice(line).ok()?;
    value.get("_id")?.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

impl ShardBackend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_backend_insert",
        skip(self, event),
        fields(shard = %self.name, event_id = %event.id)
    )]
    async fn insert_unique(&self, event: &Event) -> Result<(), InsertError> {
        let mut line =
            serde_json::to_string(event).map_err(|e| InsertError::rejected(e.to_string()))?;
        line.push('\n');

        self.state
            .lock()
            .await
            .insert(event.id, line.as_bytes())
            .await
    }
}

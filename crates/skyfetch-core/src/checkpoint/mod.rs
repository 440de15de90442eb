//! Append-only completion log for crash-safe resumption.
//!
//! The log is plain text, one completed destination path per line, read once
//! at startup. After that a single writer task owns the file: workers send it
//! ids over a channel and wait for an acknowledgement. The writer appends the
//! line, flushes and syncs, and only then marks the id as done in the shared
//! in-memory set, so within one process a "done" answer from [`CheckpointHandle::contains`]
//! is always backed by a durable line.

mod error;
mod writer;

pub use error::CheckpointError;

use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use writer::{AppendRequest, CheckpointWriter};

/// Pending appends buffered between workers and the writer.
const APPEND_QUEUE_DEPTH: usize = 64;

/// Read the completion log. A missing file is an empty log.
pub fn load(path: &Path) -> Result<HashSet<String>, CheckpointError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(source) => {
            return Err(CheckpointError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// True when the log is non-empty and its last line has no terminator
/// (torn write, or a file produced by another tool).
fn has_unterminated_tail(path: &Path) -> io::Result<bool> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Opens checkpoint logs and starts their writer task.
pub struct CheckpointStore;

impl CheckpointStore {
    /// Load `path`, open it for appending (creating it if needed) and spawn the
    /// single writer. Must be called from within a tokio runtime.
    ///
    /// The writer stops once every [`CheckpointHandle`] clone is dropped; await
    /// the returned join handle to observe its final status.
    pub async fn open(
        path: &Path,
    ) -> Result<(CheckpointHandle, JoinHandle<Result<(), CheckpointError>>), CheckpointError> {
        let completed = load(path)?;
        let loaded = completed.len();
        let write_err = |source| CheckpointError::Write {
            path: path.to_path_buf(),
            source,
        };
        let unterminated = has_unterminated_tail(path).map_err(|source| CheckpointError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(write_err)?;
        if unterminated {
            tracing::warn!(path = %path.display(), "checkpoint ends mid-line; terminating it");
            file.write_all(b"\n").await.map_err(write_err)?;
            file.sync_data().await.map_err(write_err)?;
        }

        let completed = Arc::new(RwLock::new(completed));
        let (tx, rx) = mpsc::channel(APPEND_QUEUE_DEPTH);
        let writer = CheckpointWriter::new(path.to_path_buf(), file, Arc::clone(&completed), rx);
        let task = tokio::spawn(writer.run());

        tracing::info!(path = %path.display(), entries = loaded, "checkpoint loaded");
        Ok((
            CheckpointHandle {
                path: path.to_path_buf(),
                completed,
                tx,
            },
            task,
        ))
    }
}

/// Cloneable view of an open checkpoint log.
#[derive(Clone)]
pub struct CheckpointHandle {
    path: PathBuf,
    completed: Arc<RwLock<HashSet<String>>>,
    tx: mpsc::Sender<AppendRequest>,
}

impl CheckpointHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        // A poisoned lock still holds a valid set: inserts are single-statement.
        match self.completed.read() {
            Ok(set) => set.contains(id),
            Err(poisoned) => poisoned.into_inner().contains(id),
        }
    }

    pub fn len(&self) -> usize {
        match self.completed.read() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Durably record `id`. Returns once the line is synced to storage.
    pub async fn append(&self, id: impl Into<String>) -> Result<(), CheckpointError> {
        let id = id.into();
        if id.contains('\n') || id.trim().is_empty() {
            return Err(CheckpointError::InvalidId(id));
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(AppendRequest { id, ack: ack_tx })
            .await
            .map_err(|_| CheckpointError::WriterGone)?;
        ack_rx.await.map_err(|_| CheckpointError::WriterGone)?
    }
}

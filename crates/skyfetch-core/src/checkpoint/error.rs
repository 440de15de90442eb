//! Checkpoint log errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The log exists but could not be read.
    #[error("failed to read checkpoint {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opening or appending to the log failed; the entry is not durable.
    #[error("failed to append to checkpoint {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint id must be a single non-empty line: {0:?}")]
    InvalidId(String),

    /// The writer task has stopped (earlier write failure or shutdown).
    #[error("checkpoint writer is no longer running")]
    WriterGone,
}

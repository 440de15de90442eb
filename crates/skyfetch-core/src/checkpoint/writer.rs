//! The single task that owns the checkpoint file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use super::CheckpointError;

pub(super) struct AppendRequest {
    pub(super) id: String,
    pub(super) ack: oneshot::Sender<Result<(), CheckpointError>>,
}

pub(super) struct CheckpointWriter {
    path: PathBuf,
    file: File,
    completed: Arc<RwLock<HashSet<String>>>,
    rx: mpsc::Receiver<AppendRequest>,
    /// A previous append failed and may have left a partial line behind.
    torn: bool,
}

impl CheckpointWriter {
    pub(super) fn new(
        path: PathBuf,
        file: File,
        completed: Arc<RwLock<HashSet<String>>>,
        rx: mpsc::Receiver<AppendRequest>,
    ) -> Self {
        Self {
            path,
            file,
            completed,
            rx,
            torn: false,
        }
    }

    /// Serve append requests until every sender is dropped.
    ///
    /// A failed write is reported to the requester and the writer keeps
    /// serving; the failed id is not added to the in-memory set.
    pub(super) async fn run(mut self) -> Result<(), CheckpointError> {
        let mut written = 0u64;
        let mut failed = 0u64;
        while let Some(req) = self.rx.recv().await {
            let result = self.append_line(&req.id).await;
            match &result {
                Ok(()) => {
                    let mut set = match self.completed.write() {
                        Ok(set) => set,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    set.insert(req.id);
                    written += 1;
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(path = %self.path.display(), error = %e, "checkpoint append failed");
                }
            }
            // Requester may have gone away; the line is durable either way.
            let _ = req.ack.send(result);
        }
        self.file.flush().await.map_err(|source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), written, failed, "checkpoint writer stopped");
        Ok(())
    }

    async fn append_line(&mut self, id: &str) -> Result<(), CheckpointError> {
        let line = format_line(id, self.torn);
        // Assume the worst until the whole line is synced.
        self.torn = true;
        let wrap = |source| CheckpointError::Write {
            path: self.path.clone(),
            source,
        };
        self.file.write_all(line.as_bytes()).await.map_err(wrap)?;
        self.file.flush().await.map_err(wrap)?;
        self.file.sync_data().await.map_err(wrap)?;
        self.torn = false;
        Ok(())
    }
}

/// One log line. After a failed append the line starts with a terminator so
/// whatever fragment was left behind cannot merge with it; the resulting blank
/// line is ignored by `load`.
fn format_line(id: &str, after_failure: bool) -> String {
    let mut line = String::with_capacity(id.len() + 2);
    if after_failure {
        line.push('\n');
    }
    line.push_str(id);
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_after_failed_append_starts_on_fresh_line() {
        assert_eq!(format_line("/out/a.jpeg", false), "/out/a.jpeg\n");
        assert_eq!(format_line("/out/a.jpeg", true), "\n/out/a.jpeg\n");

        // A torn fragment followed by the recovery line still loads both cleanly.
        let log = format!("/out/x.jpeg\n/out/par{}", format_line("/out/b.jpeg", true));
        let ids: Vec<&str> = log.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(ids, ["/out/x.jpeg", "/out/par", "/out/b.jpeg"]);
    }
}

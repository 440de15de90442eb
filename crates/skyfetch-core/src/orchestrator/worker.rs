//! One dispatched job: fetch on the blocking pool, then checkpoint.

use crate::checkpoint::{CheckpointError, CheckpointHandle};
use crate::fetch::{FetchExecutor, FetchOutcome};
use crate::job::DownloadJob;

#[derive(Debug)]
pub(super) enum JobOutcome {
    /// Fetched and durably checkpointed.
    Succeeded { bytes: u64 },
    /// Found done at dispatch time (checkpoint or file); nothing fetched.
    /// A file found on disk is appended to the checkpoint.
    Skipped,
    /// No file was produced.
    Failed {
        category: &'static str,
        reason: String,
    },
    /// File written but the checkpoint append failed.
    Unrecorded(CheckpointError),
}

#[derive(Debug)]
pub(super) struct JobReport {
    pub(super) job: DownloadJob,
    pub(super) outcome: JobOutcome,
}

/// Run `job` to a terminal outcome. Never panics on fetch errors; a panic in
/// the blocking fetch is reported as a failure.
pub(super) async fn run_job(
    job: DownloadJob,
    executor: FetchExecutor,
    checkpoint: CheckpointHandle,
) -> JobReport {
    let id = job.checkpoint_id();
    if checkpoint.contains(&id) {
        return JobReport {
            job,
            outcome: JobOutcome::Skipped,
        };
    }

    let fetch = {
        let job = job.clone();
        tokio::task::spawn_blocking(move || executor.execute(&job)).await
    };

    let outcome = match fetch {
        Ok(Ok(FetchOutcome::Fetched { bytes })) => match checkpoint.append(id).await {
            Ok(()) => JobOutcome::Succeeded { bytes },
            Err(e) => JobOutcome::Unrecorded(e),
        },
        // Appeared since planning (another process, or a copy): the file is
        // complete by construction, so record it and move on.
        Ok(Ok(FetchOutcome::AlreadyPresent)) => match checkpoint.append(id).await {
            Ok(()) => JobOutcome::Skipped,
            Err(e) => JobOutcome::Unrecorded(e),
        },
        Ok(Err(e)) => JobOutcome::Failed {
            category: e.category(),
            reason: e.to_string(),
        },
        Err(join) => JobOutcome::Failed {
            category: "panic",
            reason: format!("fetch task failed: {}", join),
        },
    };
    JobReport { job, outcome }
}

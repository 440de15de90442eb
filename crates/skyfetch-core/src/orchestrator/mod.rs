//! Run orchestration: plan, throttle, dispatch, record.
//!
//! Pipeline per run:
//! catalog rows → jobs → plan (skip done) → bounded pool
//! → fetch → checkpoint append | failure record.
//!
//! Keeps up to `priority.worker_count()` jobs in flight; before each dispatch
//! the resource monitor may hold the dispatcher until the host has recovered.

mod plan;
mod progress;
mod worker;

pub use progress::ProgressStats;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};

use crate::checkpoint::CheckpointStore;
use crate::config::SkyfetchConfig;
use crate::failure::{FailureRecord, FailureRecorder};
use crate::fetch::{FetchExecutor, Fetcher, DEFAULT_REQUEST_TIMEOUT};
use crate::job::{build_jobs, CatalogRow, CutoutEndpoint, DownloadJob, DEFAULT_RADII};
use crate::monitor::{Priority, ResourceMonitor};

use worker::{run_job, JobOutcome, JobReport};

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Where cutouts, the checkpoint and the failure list live.
    pub output_dir: PathBuf,
    pub priority: Priority,
    /// Size for rows without a `radii` value.
    pub default_radii: u32,
    pub endpoint: CutoutEndpoint,
    pub request_timeout: Duration,
    pub checkpoint_file_name: String,
    pub failure_file_name: String,
    /// Progress signal cadence, in completions.
    pub progress_every: usize,
    /// Extra host check cadence, in completions.
    pub recheck_every: usize,
}

impl RunOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&SkyfetchConfig::default(), output_dir)
    }

    pub fn from_config(cfg: &SkyfetchConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            priority: Priority::default(),
            default_radii: DEFAULT_RADII,
            endpoint: cfg.endpoint(),
            request_timeout: cfg.request_timeout(),
            checkpoint_file_name: cfg.checkpoint_file_name.clone(),
            failure_file_name: cfg.failure_file_name.clone(),
            progress_every: cfg.progress_every.max(1),
            recheck_every: cfg.recheck_every.max(1),
        }
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join(&self.checkpoint_file_name)
    }

    pub fn failure_path(&self) -> PathBuf {
        self.output_dir.join(&self.failure_file_name)
    }
}

/// Final counts of a run. `requested == already_present + succeeded + failed + unrecorded`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub requested: usize,
    pub already_present: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Files written whose checkpoint append failed.
    pub unrecorded: usize,
    pub bytes_fetched: u64,
    pub workers: usize,
    pub failures: Vec<FailureRecord>,
    /// Failure list written at the end of the run, if anything failed.
    pub failures_path: Option<PathBuf>,
}

/// Counters updated as completions arrive.
#[derive(Debug, Default)]
struct Tally {
    completed: usize,
    skipped: usize,
    succeeded: usize,
    failed: usize,
    unrecorded: usize,
    bytes: u64,
}

pub struct Orchestrator {
    options: RunOptions,
    executor: FetchExecutor,
    monitor: Arc<ResourceMonitor>,
}

impl Orchestrator {
    pub fn new(mut options: RunOptions, fetcher: Arc<dyn Fetcher>, monitor: Arc<ResourceMonitor>) -> Self {
        options.progress_every = options.progress_every.max(1);
        options.recheck_every = options.recheck_every.max(1);
        let timeout = if options.request_timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            options.request_timeout
        };
        Self {
            executor: FetchExecutor::new(fetcher, timeout),
            options,
            monitor,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Fetch every row not already satisfied. Only setup failures (output dir,
    /// checkpoint log) are errors; per-job failures end up in the report.
    pub async fn run(
        &self,
        rows: Vec<CatalogRow>,
        progress_tx: Option<mpsc::Sender<ProgressStats>>,
    ) -> Result<RunReport> {
        let opts = &self.options;
        tokio::fs::create_dir_all(&opts.output_dir)
            .await
            .with_context(|| format!("failed to create output dir {}", opts.output_dir.display()))?;

        let (checkpoint, writer) = CheckpointStore::open(&opts.checkpoint_path())
            .await
            .context("open checkpoint")?;

        let jobs = build_jobs(&rows, &opts.endpoint, &opts.output_dir, opts.default_radii);
        let requested = jobs.len();
        let plan = plan::plan(jobs, &checkpoint);
        let total = plan.to_fetch.len();
        let workers = opts.priority.worker_count();
        tracing::info!(to_fetch = total, already_present = plan.already_present, "job list ready");
        tracing::info!(
            workers,
            priority = opts.priority.value(),
            cpu_threshold = opts.priority.cpu_threshold(),
            mem_threshold_gb = opts.priority.mem_threshold_gb(),
            "starting downloads"
        );

        let started = Instant::now();
        let mut failures = FailureRecorder::new();
        let mut tally = Tally::default();
        let mut queue = plan.to_fetch.into_iter().peekable();
        let mut join_set: JoinSet<JobReport> = JoinSet::new();
        // Jobs in flight, so a task that dies still reaches the failure list.
        let mut in_flight: HashMap<task::Id, DownloadJob> = HashMap::new();

        loop {
            while join_set.len() < workers && queue.peek().is_some() {
                let paused = self.monitor.wait_until_clear().await;
                if !paused.is_zero() {
                    tracing::info!(paused_secs = paused.as_secs_f64(), "resuming dispatch");
                }
                let Some(job) = queue.next() else {
                    break;
                };
                tracing::debug!(key = %job.key, url = %job.url, "dispatch");
                let handle = join_set.spawn(run_job(job.clone(), self.executor.clone(), checkpoint.clone()));
                in_flight.insert(handle.id(), job);
            }

            let Some(res) = join_set.join_next_with_id().await else {
                break;
            };
            tally.completed += 1;
            match res {
                Ok((id, report)) => {
                    in_flight.remove(&id);
                    self.record(report, &mut tally, &mut failures);
                }
                Err(e) => record_lost_task(e, &mut in_flight, &mut tally, &mut failures),
            }

            if tally.completed % opts.progress_every == 0 {
                let stats = ProgressStats {
                    completed: tally.completed,
                    total,
                    succeeded: tally.succeeded,
                    failed: tally.failed,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                };
                tracing::info!(
                    completed = stats.completed,
                    total,
                    succeeded = stats.succeeded,
                    failed = stats.failed,
                    "progress"
                );
                if let Some(tx) = &progress_tx {
                    let _ = tx.send(stats).await;
                }
            }
            if tally.completed % opts.recheck_every == 0 {
                self.monitor.adaptive_wait().await;
            }
        }

        drop(checkpoint);
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "checkpoint writer finished with error"),
            Err(e) => tracing::error!(error = %e, "checkpoint writer task failed"),
        }

        let failures_path = match failures.write_artifact(&opts.failure_path()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "could not write failure list");
                None
            }
        };

        let report = RunReport {
            requested,
            already_present: plan.already_present + tally.skipped,
            succeeded: tally.succeeded,
            failed: tally.failed,
            unrecorded: tally.unrecorded,
            bytes_fetched: tally.bytes,
            workers,
            failures: failures.records().to_vec(),
            failures_path,
        };
        tracing::info!(
            requested = report.requested,
            already_present = report.already_present,
            succeeded = report.succeeded,
            failed = report.failed,
            unrecorded = report.unrecorded,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "run finished"
        );
        Ok(report)
    }

    fn record(&self, report: JobReport, tally: &mut Tally, failures: &mut FailureRecorder) {
        let JobReport { job, outcome } = report;
        match outcome {
            JobOutcome::Succeeded { bytes } => {
                tally.succeeded += 1;
                tally.bytes += bytes;
                tracing::info!(key = %job.key, bytes, path = %job.destination.display(), "downloaded");
            }
            JobOutcome::Skipped => {
                tally.skipped += 1;
                tracing::info!(key = %job.key, "already present at dispatch, skipped");
            }
            JobOutcome::Failed { category, reason } => {
                tally.failed += 1;
                tracing::error!(key = %job.key, url = %job.url, category, reason = %reason, "download failed");
                failures.record(&job, reason);
            }
            JobOutcome::Unrecorded(e) => {
                tally.unrecorded += 1;
                tracing::error!(
                    key = %job.key,
                    path = %job.destination.display(),
                    error = %e,
                    "file written but NOT checkpointed"
                );
            }
        }
    }
}

/// A job task that died before reporting (panic or abort) counts as failed
/// and is listed in the failure artifact like any other failure.
fn record_lost_task(
    err: JoinError,
    in_flight: &mut HashMap<task::Id, DownloadJob>,
    tally: &mut Tally,
    failures: &mut FailureRecorder,
) {
    tally.failed += 1;
    match in_flight.remove(&err.id()) {
        Some(job) => {
            tracing::error!(key = %job.key, error = %err, "job task join failed");
            failures.record(&job, format!("job task failed: {}", err));
        }
        None => tracing::error!(error = %err, "job task join failed"),
    }
}

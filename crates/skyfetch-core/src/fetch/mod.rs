//! Fetch one cutout: idempotent skip, single GET, atomic write.
//!
//! Exactly one network attempt per call. Retrying is a run-level policy:
//! re-running the whole job set against the same checkpoint picks up whatever
//! failed.

mod error;
mod http;

pub use error::{classify_curl_error, FetchError, TransportKind};
pub use http::CurlFetcher;

use std::sync::Arc;
use std::time::Duration;

use crate::job::DownloadJob;
use crate::storage;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A blocking HTTP GET. Returns the body for HTTP 200 only.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Successful terminal outcome of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body written to the destination.
    Fetched { bytes: u64 },
    /// Destination already on disk; no request was made.
    AlreadyPresent,
}

#[derive(Clone)]
pub struct FetchExecutor {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl FetchExecutor {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one job. Blocking; call from `spawn_blocking` in async code.
    pub fn execute(&self, job: &DownloadJob) -> Result<FetchOutcome, FetchError> {
        if job.destination.exists() {
            tracing::debug!(key = %job.key, "destination exists, skipping request");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let body = self.fetcher.get(&job.url, self.timeout)?;
        if body.is_empty() {
            tracing::warn!(key = %job.key, "HTTP 200 with empty body");
        }
        storage::write_atomic(&job.destination, &body)?;
        Ok(FetchOutcome::Fetched {
            bytes: body.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{CatalogRow, CutoutEndpoint};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher {
        status: u32,
        calls: AtomicUsize,
    }

    impl Fetcher for StaticFetcher {
        fn get(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.status == 200 {
                Ok(b"jpeg-bytes".to_vec())
            } else {
                Err(FetchError::Rejected { status: self.status })
            }
        }
    }

    fn job_in(dir: &std::path::Path) -> DownloadJob {
        let row = CatalogRow {
            index: 0,
            ra: 10.0,
            dec: 5.0,
            radii: None,
            name: None,
        };
        DownloadJob::from_row(&row, &CutoutEndpoint::default(), dir, 256)
    }

    fn executor(status: u32) -> (FetchExecutor, Arc<StaticFetcher>) {
        let fetcher = Arc::new(StaticFetcher {
            status,
            calls: AtomicUsize::new(0),
        });
        (
            FetchExecutor::new(fetcher.clone(), DEFAULT_REQUEST_TIMEOUT),
            fetcher,
        )
    }

    #[test]
    fn writes_body_on_200() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        let (exec, fetcher) = executor(200);
        let outcome = exec.execute(&job).unwrap();
        assert_eq!(outcome, FetchOutcome::Fetched { bytes: 10 });
        assert_eq!(std::fs::read(&job.destination).unwrap(), b"jpeg-bytes");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn existing_destination_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        std::fs::write(&job.destination, b"old").unwrap();
        let (exec, fetcher) = executor(200);
        assert_eq!(exec.execute(&job).unwrap(), FetchOutcome::AlreadyPresent);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&job.destination).unwrap(), b"old");
    }

    #[test]
    fn non_200_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        let (exec, _) = executor(404);
        let err = exec.execute(&job).unwrap_err();
        assert!(matches!(err, FetchError::Rejected { status: 404 }));
        assert!(!job.destination.exists());
    }

    #[test]
    fn storage_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(&dir.path().join("does-not-exist"));
        let (exec, _) = executor(200);
        assert!(matches!(exec.execute(&job), Err(FetchError::Storage(_))));
    }
}

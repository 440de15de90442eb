//! Terminal failures of a run and the retry-list artifact.
//!
//! The recorder is an owned accumulator handed to the orchestrator; it is
//! write-only during the run and flushed once at the end. The artifact is a
//! `name,ra,dec` CSV, which is itself a valid job source for a follow-up run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::job::DownloadJob;

/// One job whose fetch did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub key: String,
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub reason: String,
}

/// Row layout of the artifact.
#[derive(Debug, Serialize)]
struct ArtifactRow<'a> {
    name: &'a str,
    ra: f64,
    dec: f64,
}

#[derive(Debug, Default)]
pub struct FailureRecorder {
    records: Vec<FailureRecord>,
}

impl FailureRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, job: &DownloadJob, reason: impl Into<String>) {
        self.records.push(FailureRecord {
            key: job.key.clone(),
            name: job.display_name().to_string(),
            ra: job.ra,
            dec: job.dec,
            reason: reason.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    /// Write the artifact to `path` if anything failed. Returns the path
    /// written, or `None` when there was nothing to record.
    pub fn write_artifact(&self, path: &Path) -> Result<Option<PathBuf>> {
        if self.records.is_empty() {
            return Ok(None);
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create failure list {}", path.display()))?;
        for r in &self.records {
            writer.serialize(ArtifactRow {
                name: &r.name,
                ra: r.ra,
                dec: r.dec,
            })?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to write failure list {}", path.display()))?;
        tracing::info!(path = %path.display(), count = self.records.len(), "failed objects list saved");
        Ok(Some(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{CatalogRow, CutoutEndpoint};
    use crate::source::{DelimitedTable, JobSource};

    fn job(index: usize, ra: f64, dec: f64, name: Option<&str>) -> DownloadJob {
        let row = CatalogRow {
            index,
            ra,
            dec,
            radii: None,
            name: name.map(str::to_string),
        };
        DownloadJob::from_row(&row, &CutoutEndpoint::default(), Path::new("out"), 256)
    }

    #[test]
    fn empty_recorder_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed_objects.csv");
        assert!(FailureRecorder::new().write_artifact(&path).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn artifact_round_trips_as_job_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed_objects.csv");
        let mut rec = FailureRecorder::new();
        rec.record(&job(0, 10.0, 5.0, Some("M31")), "HTTP 404");
        rec.record(&job(7, 11.5, -6.25, None), "timeout error");
        assert_eq!(rec.len(), 2);

        let written = rec.write_artifact(&path).unwrap().unwrap();
        let text = std::fs::read_to_string(&written).unwrap();
        assert!(text.starts_with("name,ra,dec\n"));

        let rows = DelimitedTable::new(&written).rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name.as_deref(), Some("M31"));
        assert_eq!(rows[1].name.as_deref(), Some("11.5_-6.25_7"));
        assert_eq!((rows[1].ra, rows[1].dec), (11.5, -6.25));
    }
}

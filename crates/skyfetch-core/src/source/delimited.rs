//! Comma-separated catalog with a header row.

use std::path::PathBuf;

use super::row::read_rows;
use super::{JobSource, SourceError};
use crate::job::CatalogRow;

/// A plain CSV table (`ra,dec[,radii][,name]`).
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    path: PathBuf,
}

impl DelimitedTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl JobSource for DelimitedTable {
    fn rows(&mut self) -> Result<Vec<CatalogRow>, SourceError> {
        if !self.path.is_file() {
            return Err(SourceError::Missing(self.path.clone()));
        }
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|source| SourceError::Table {
                path: self.path.clone(),
                source,
            })?;
        read_rows(reader, &self.path)
    }
}

//! ECSV tables: a `#`-prefixed YAML header followed by delimited data.
//!
//! Only the pieces needed to read coordinates are understood: the optional
//! `delimiter:` entry of the header (space by default) and the column header
//! line. Column datatypes in the YAML block are ignored; cells are parsed the
//! same way as in a CSV table.

use std::fs;
use std::path::PathBuf;

use super::row::read_rows;
use super::{JobSource, SourceError};
use crate::job::CatalogRow;

#[derive(Debug, Clone)]
pub struct StructuredTable {
    path: PathBuf,
}

impl StructuredTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Pull the delimiter out of a header line like `# delimiter: ','`.
fn header_delimiter(line: &str) -> Option<u8> {
    let rest = line.trim_start_matches('#').trim();
    let value = rest.strip_prefix("delimiter:")?.trim();
    let value = value.trim_matches(|c| c == '\'' || c == '"');
    match value.as_bytes() {
        [b] => Some(*b),
        [] => Some(b' '),
        _ => None,
    }
}

impl JobSource for StructuredTable {
    fn rows(&mut self) -> Result<Vec<CatalogRow>, SourceError> {
        let text = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SourceError::Missing(self.path.clone())
            } else {
                SourceError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let mut delimiter = b' ';
        let mut body = String::with_capacity(text.len());
        for line in text.lines() {
            if line.trim_start().starts_with('#') {
                if let Some(d) = header_delimiter(line) {
                    delimiter = d;
                }
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            body.push_str(line);
            body.push('\n');
        }

        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());
        read_rows(reader, &self.path)
    }
}

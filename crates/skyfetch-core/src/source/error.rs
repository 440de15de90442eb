//! Job source errors. All of them are fatal before dispatch.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The table file does not exist.
    #[error("job source not found: {}", .0.display())]
    Missing(PathBuf),

    /// A required column is absent from the header.
    #[error("job source {} is missing required column `{column}`", path.display())]
    Schema { path: PathBuf, column: &'static str },

    /// A cell could not be parsed (row is 0-based, header excluded).
    #[error("job source {}, row {row}: {message}", path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("failed to read job source {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

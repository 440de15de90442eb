//! Job sources: catalog tables that yield one row per cutout.
//!
//! The orchestrator only sees [`JobSource`]; format detection lives in
//! [`open_source`], which picks an adapter by file extension:
//! - `.ecsv` → [`StructuredTable`]
//! - anything else → [`DelimitedTable`] (comma-separated with a header row)

mod delimited;
mod ecsv;
mod error;
mod row;

pub use delimited::DelimitedTable;
pub use ecsv::StructuredTable;
pub use error::SourceError;

use std::path::{Path, PathBuf};

use crate::job::CatalogRow;

/// Columns tried, in order, for the row identifier. `object_id` wins when a
/// table carries both it and a display name.
pub const IDENTIFIER_COLUMNS: [&str; 3] = ["object_id", "name", "Name"];

/// A finite, ordered supply of catalog rows.
pub trait JobSource {
    /// Read every row. Fails if the table is missing required columns or a
    /// coordinate cell cannot be parsed.
    fn rows(&mut self) -> Result<Vec<CatalogRow>, SourceError>;
}

/// Resolve `path` to an existing table file.
///
/// A bare prefix without extension is accepted: `<path>.ecsv` is tried first,
/// then `<path>.csv`.
pub fn resolve_path(path: &Path) -> Result<PathBuf, SourceError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.extension().is_none() {
        for ext in ["ecsv", "csv"] {
            let candidate = path.with_extension(ext);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(SourceError::Missing(path.to_path_buf()))
}

/// Open the job source at `path`, choosing the adapter by extension.
pub fn open_source(path: &Path) -> Result<Box<dyn JobSource>, SourceError> {
    let resolved = resolve_path(path)?;
    let is_ecsv = resolved
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("ecsv"))
        .unwrap_or(false);
    tracing::debug!(path = %resolved.display(), ecsv = is_ecsv, "opening job source");
    if is_ecsv {
        Ok(Box::new(StructuredTable::new(resolved)))
    } else {
        Ok(Box::new(DelimitedTable::new(resolved)))
    }
}

/// Keep only rows whose identifier equals `id`. Row indices are preserved.
pub fn filter_by_identifier(rows: Vec<CatalogRow>, id: &str) -> Vec<CatalogRow> {
    rows.into_iter()
        .filter(|r| r.name.as_deref() == Some(id))
        .collect()
}

/// Read all rows from the table at `path`, optionally restricted to one object.
pub fn load_rows(path: &Path, object: Option<&str>) -> Result<Vec<CatalogRow>, SourceError> {
    let rows = open_source(path)?.rows()?;
    let total = rows.len();
    let rows = match object {
        Some(id) => filter_by_identifier(rows, id),
        None => rows,
    };
    tracing::info!(rows = rows.len(), total, object = object.unwrap_or("-"), "catalog loaded");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn open_source_picks_adapter_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("cat.csv");
        fs::write(&csv_path, "ra,dec\n1.0,2.0\n").unwrap();
        let ecsv_path = dir.path().join("cat.ecsv");
        fs::write(
            &ecsv_path,
            "# %ECSV 1.0\n# ---\n# datatype:\n# - {name: ra, datatype: float64}\n# - {name: dec, datatype: float64}\nra dec\n3.0 4.0\n",
        )
        .unwrap();

        let rows = open_source(&csv_path).unwrap().rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ra, 1.0);

        let rows = open_source(&ecsv_path).unwrap().rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dec, 4.0);
    }

    #[test]
    fn bare_prefix_prefers_ecsv_then_csv() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("catalog");
        fs::write(dir.path().join("catalog.csv"), "ra,dec\n1.0,2.0\n").unwrap();
        assert_eq!(resolve_path(&prefix).unwrap(), dir.path().join("catalog.csv"));

        fs::write(dir.path().join("catalog.ecsv"), "ra dec\n1.0 2.0\n").unwrap();
        assert_eq!(resolve_path(&prefix).unwrap(), dir.path().join("catalog.ecsv"));
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_source(&dir.path().join("nope.csv")).err().unwrap();
        assert!(matches!(err, SourceError::Missing(_)));
    }

    #[test]
    fn load_rows_filters_by_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.csv");
        fs::write(&path, "object_id,ra,dec\nm31,10.68,41.27\nm33,23.46,30.66\n").unwrap();
        assert_eq!(load_rows(&path, None).unwrap().len(), 2);
        let rows = load_rows(&path, Some("m33")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 1);
        assert!(load_rows(&path, Some("m1")).unwrap().is_empty());
    }

    #[test]
    fn object_filter_prefers_object_id_over_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.csv");
        fs::write(&path, "name,object_id,ra,dec\nAndromeda,m31,10.68,41.27\nm31,m33,23.46,30.66\n").unwrap();
        let rows = load_rows(&path, Some("m31")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 0);
        assert_eq!(rows[0].name.as_deref(), Some("m31"));
    }

    #[test]
    fn identifier_filter_keeps_original_indices() {
        let rows = vec![
            CatalogRow { index: 0, ra: 1.0, dec: 1.0, radii: None, name: Some("a".into()) },
            CatalogRow { index: 1, ra: 2.0, dec: 2.0, radii: None, name: Some("b".into()) },
            CatalogRow { index: 2, ra: 3.0, dec: 3.0, radii: None, name: None },
        ];
        let kept = filter_by_identifier(rows, "b");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].index, 1);
    }
}

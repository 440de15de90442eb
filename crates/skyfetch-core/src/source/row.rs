//! Column resolution and cell parsing shared by the table adapters.

use std::io;
use std::path::Path;

use csv::StringRecord;

use super::{SourceError, IDENTIFIER_COLUMNS};
use crate::job::CatalogRow;

/// Positions of the columns we care about in one table's header.
#[derive(Debug, Clone, Copy)]
struct Columns {
    ra: usize,
    dec: usize,
    radii: Option<usize>,
    name: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self, SourceError> {
        let find = |wanted: &str| headers.iter().position(|h| h.trim() == wanted);
        let ra = find("ra").ok_or_else(|| SourceError::Schema {
            path: path.to_path_buf(),
            column: "ra",
        })?;
        let dec = find("dec").ok_or_else(|| SourceError::Schema {
            path: path.to_path_buf(),
            column: "dec",
        })?;
        Ok(Self {
            ra,
            dec,
            radii: find("radii"),
            name: IDENTIFIER_COLUMNS.iter().find_map(|c| find(*c)),
        })
    }

    fn parse(&self, record: &StringRecord, index: usize, path: &Path) -> Result<CatalogRow, SourceError> {
        let parse_err = |message: String| SourceError::Parse {
            path: path.to_path_buf(),
            row: index,
            message,
        };
        let coord = |col: usize, label: &str| -> Result<f64, SourceError> {
            let cell = record.get(col).unwrap_or("").trim();
            let value: f64 = cell
                .parse()
                .map_err(|_| parse_err(format!("invalid {} value {:?}", label, cell)))?;
            if !value.is_finite() {
                return Err(parse_err(format!("non-finite {} value {:?}", label, cell)));
            }
            Ok(value)
        };

        let ra = coord(self.ra, "ra")?;
        let dec = coord(self.dec, "dec")?;
        let radii = match self.radii.and_then(|c| record.get(c)) {
            Some(cell) => parse_radii(cell).map_err(parse_err)?,
            None => None,
        };
        let name = self
            .name
            .and_then(|c| record.get(c))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(CatalogRow {
            index,
            ra,
            dec,
            radii,
            name,
        })
    }
}

/// Empty / `nan` cells mean "use the default". Integral floats (`256.0`) are
/// accepted since some writers store the column as float.
fn parse_radii(cell: &str) -> Result<Option<u32>, String> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(v) = cell.parse::<u32>() {
        return if v == 0 {
            Err("radii must be positive".to_string())
        } else {
            Ok(Some(v))
        };
    }
    match cell.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= 1.0 && v <= u32::MAX as f64 => Ok(Some(v as u32)),
        _ => Err(format!("invalid radii value {:?}", cell)),
    }
}

/// Read all rows from an already-configured CSV reader.
pub(super) fn read_rows<R: io::Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<CatalogRow>, SourceError> {
    let table_err = |source: csv::Error| SourceError::Table {
        path: path.to_path_buf(),
        source,
    };
    let headers = reader.headers().map_err(table_err)?.clone();
    let columns = Columns::resolve(&headers, path)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(table_err)?;
        rows.push(columns.parse(&record, index, path)?);
    }
    Ok(rows)
}

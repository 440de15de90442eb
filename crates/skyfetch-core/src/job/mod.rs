//! Download jobs: one cutout per catalog row.
//!
//! A job carries everything a worker needs (URL, destination path) plus the
//! row's coordinates so a failure can be reported back in source terms.

mod endpoint;

pub use endpoint::CutoutEndpoint;

use std::path::{Path, PathBuf};

/// Cutout size used when a row has no `radii` value.
pub const DEFAULT_RADII: u32 = 256;

/// One parsed job-source row.
///
/// `index` is the row's position in the source table before any filtering,
/// so the key of a row is stable whether or not an identifier filter is used.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub index: usize,
    pub ra: f64,
    pub dec: f64,
    pub radii: Option<u32>,
    pub name: Option<String>,
}

/// A single cutout fetch. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    /// `{ra}_{dec}_{index}`; unique per row even for duplicate coordinates.
    pub key: String,
    pub url: String,
    pub destination: PathBuf,
    pub ra: f64,
    pub dec: f64,
    pub radii: u32,
    pub name: Option<String>,
}

impl DownloadJob {
    pub fn from_row(
        row: &CatalogRow,
        endpoint: &CutoutEndpoint,
        output_dir: &Path,
        default_radii: u32,
    ) -> Self {
        let radii = row.radii.unwrap_or(default_radii);
        let key = job_key(row.ra, row.dec, row.index);
        let destination = output_dir.join(destination_file_name(&key, radii));
        Self {
            url: endpoint.url_for(row.ra, row.dec, radii),
            key,
            destination,
            ra: row.ra,
            dec: row.dec,
            radii,
            name: row.name.clone(),
        }
    }

    /// Identifier written to the checkpoint log once this job completes.
    pub fn checkpoint_id(&self) -> String {
        self.destination.to_string_lossy().into_owned()
    }

    /// Name used in failure reports: the row identifier, or the key.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }
}

/// Render a coordinate the way catalog tools print floats: shortest
/// round-trip digits, always with a decimal point (`10.0`, not `10`), and a
/// signed two-digit exponent for very small or large magnitudes (`1e-05`,
/// `1.5e+16`), so names match files produced by earlier tooling.
pub fn format_coord(value: f64) -> String {
    let shortest = format!("{:?}", value);
    let Some((mantissa, exponent)) = shortest.split_once('e') else {
        return shortest;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exponent),
    };
    format!("{}e{}{:0>2}", mantissa, sign, digits)
}

pub fn job_key(ra: f64, dec: f64, index: usize) -> String {
    format!("{}_{}_{}", format_coord(ra), format_coord(dec), index)
}

pub fn destination_file_name(key: &str, radii: u32) -> String {
    format!("{}_{}pix.jpeg", key, radii)
}

/// Build the job list for a run, in source order.
pub fn build_jobs(
    rows: &[CatalogRow],
    endpoint: &CutoutEndpoint,
    output_dir: &Path,
    default_radii: u32,
) -> Vec<DownloadJob> {
    rows.iter()
        .map(|row| DownloadJob::from_row(row, endpoint, output_dir, default_radii))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, ra: f64, dec: f64, radii: Option<u32>) -> CatalogRow {
        CatalogRow {
            index,
            ra,
            dec,
            radii,
            name: None,
        }
    }

    #[test]
    fn coordinates_keep_decimal_point() {
        assert_eq!(format_coord(10.0), "10.0");
        assert_eq!(format_coord(-5.25), "-5.25");
        assert_eq!(format_coord(150.123456), "150.123456");
    }

    #[test]
    fn tiny_and_huge_coordinates_use_signed_two_digit_exponent() {
        assert_eq!(format_coord(0.0001), "0.0001");
        assert_eq!(format_coord(0.00001), "1e-05");
        assert_eq!(format_coord(-2.5e-7), "-2.5e-07");
        assert_eq!(format_coord(1e16), "1e+16");
        assert_eq!(format_coord(1.5e-100), "1.5e-100");
        assert_eq!(format_coord(0.0), "0.0");
        assert_eq!(job_key(0.00001, 5.0, 2), "1e-05_5.0_2");
    }

    #[test]
    fn job_naming_matches_reference_layout() {
        let endpoint = CutoutEndpoint::default();
        let job = DownloadJob::from_row(&row(0, 10.0, 5.0, None), &endpoint, Path::new("/out"), 256);
        assert_eq!(job.key, "10.0_5.0_0");
        assert_eq!(job.radii, 256);
        assert_eq!(job.destination, Path::new("/out/10.0_5.0_0_256pix.jpeg"));
        assert_eq!(job.checkpoint_id(), "/out/10.0_5.0_0_256pix.jpeg");
    }

    #[test]
    fn row_radii_overrides_default() {
        let endpoint = CutoutEndpoint::default();
        let job = DownloadJob::from_row(&row(3, 1.5, 2.5, Some(128)), &endpoint, Path::new("o"), 256);
        assert_eq!(job.destination, Path::new("o/1.5_2.5_3_128pix.jpeg"));
        assert!(job.url.contains("size=128"));
    }

    #[test]
    fn duplicate_coordinates_get_distinct_keys() {
        let endpoint = CutoutEndpoint::default();
        let rows = vec![row(0, 10.0, 5.0, None), row(1, 10.0, 5.0, None)];
        let jobs = build_jobs(&rows, &endpoint, Path::new("o"), DEFAULT_RADII);
        assert_ne!(jobs[0].key, jobs[1].key);
        assert_ne!(jobs[0].destination, jobs[1].destination);
    }

    #[test]
    fn display_name_falls_back_to_key() {
        let endpoint = CutoutEndpoint::default();
        let mut r = row(0, 1.0, 2.0, None);
        let job = DownloadJob::from_row(&r, &endpoint, Path::new("o"), 64);
        assert_eq!(job.display_name(), "1.0_2.0_0");
        r.name = Some("NGC 1300".to_string());
        let named = DownloadJob::from_row(&r, &endpoint, Path::new("o"), 64);
        assert_eq!(named.display_name(), "NGC 1300");
    }
}

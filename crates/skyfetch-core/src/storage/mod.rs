//! Destination file lifecycle.
//!
//! A cutout is written to `<dest>.part`, synced, then atomically renamed to
//! its final name. A file at the final path is therefore always complete,
//! which is what lets "destination exists" count as "already downloaded".

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.jpeg` → `a.jpeg.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Write `data` to `final_path` via a synced temp file and rename.
/// On failure the temp file is removed and `final_path` is left untouched.
pub fn write_atomic(final_path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = temp_path(final_path);
    let result = (|| {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, final_path)
    })();
    if result.is_err() {
        remove_stale_temp(final_path);
    }
    result
}

/// Best-effort removal of a leftover `.part` for `final_path`.
pub fn remove_stale_temp(final_path: &Path) {
    let tmp = temp_path(final_path);
    match std::fs::remove_file(&tmp) {
        Ok(()) => tracing::debug!(path = %tmp.display(), "removed stale temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %tmp.display(), error = %e, "could not remove temp file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("cutout.jpeg"));
        assert_eq!(p.to_string_lossy(), "cutout.jpeg.part");
        let p2 = temp_path(Path::new("/tmp/10.0_5.0_0_256pix.jpeg"));
        assert_eq!(p2.to_string_lossy(), "/tmp/10.0_5.0_0_256pix.jpeg.part");
    }

    #[test]
    fn write_atomic_leaves_only_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("a.jpeg");
        write_atomic(&final_path, b"\xff\xd8jpeg").unwrap();
        assert_eq!(std::fs::read(&final_path).unwrap(), b"\xff\xd8jpeg");
        assert!(!temp_path(&final_path).exists());
    }

    #[test]
    fn write_atomic_into_missing_dir_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("missing").join("a.jpeg");
        assert!(write_atomic(&final_path, b"x").is_err());
        assert!(!final_path.exists());
    }

    #[test]
    fn stale_temp_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("b.jpeg");
        std::fs::write(temp_path(&final_path), b"partial").unwrap();
        remove_stale_temp(&final_path);
        assert!(!temp_path(&final_path).exists());
    }
}

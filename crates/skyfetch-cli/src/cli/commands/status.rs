//! `skyfetch status` – summarize an output directory.

use anyhow::{Context, Result};
use skyfetch_core::checkpoint;
use skyfetch_core::config::SkyfetchConfig;
use skyfetch_core::source;
use std::path::Path;

pub fn run_status(cfg: &SkyfetchConfig, output: &Path) -> Result<()> {
    let checkpoint_path = output.join(&cfg.checkpoint_file_name);
    let completed = checkpoint::load(&checkpoint_path)
        .with_context(|| format!("failed to read checkpoint in {}", output.display()))?;
    let on_disk = completed.iter().filter(|p| Path::new(p).is_file()).count();

    println!("Output:     {}", output.display());
    println!("Checkpoint: {}", checkpoint_path.display());
    println!("Completed:  {} ({} present on disk)", completed.len(), on_disk);

    let failure_path = output.join(&cfg.failure_file_name);
    if failure_path.is_file() {
        match source::load_rows(&failure_path, None) {
            Ok(rows) => println!("Failed:     {} listed in {}", rows.len(), failure_path.display()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read failure list");
                println!("Failed:     unreadable list at {}", failure_path.display());
            }
        }
    } else {
        println!("Failed:     none recorded");
    }
    Ok(())
}

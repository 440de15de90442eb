//! CLI for the skyfetch cutout downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use skyfetch_core::config::{self, SkyfetchConfig};
use std::path::{Path, PathBuf};

use commands::{run_fetch, run_status, FetchArgs};

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "legacy_color_images";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "skyfetch")]
#[command(about = "skyfetch: resumable, host-friendly sky cutout downloader", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of ~/.config/skyfetch/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one cutout per catalog row into the output directory.
    Fetch {
        /// Catalog table (.csv or .ecsv). A bare prefix tries .ecsv, then .csv.
        table: PathBuf,

        /// Only fetch rows whose identifier (object_id, else name / Name) equals this value.
        #[arg(long, value_name = "ID")]
        object: Option<String>,

        /// Output directory for cutouts, checkpoint and failure list.
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
        output: PathBuf,

        /// Cutout size in pixels for rows without a radii value.
        #[arg(long, default_value_t = skyfetch_core::job::DEFAULT_RADII, value_name = "N")]
        radii_default: u32,

        /// Aggressiveness in [0.1, 1.0]: higher means more workers and looser host thresholds.
        #[arg(long, default_value_t = 0.5, value_name = "P")]
        priority: f64,
    },

    /// Show checkpoint and failure-list state of an output directory.
    Status {
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
        output: PathBuf,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                table,
                object,
                output,
                radii_default,
                priority,
            } => {
                let args = FetchArgs {
                    table,
                    object,
                    output,
                    radii_default,
                    priority,
                };
                run_fetch(&cfg, args).await?;
            }
            CliCommand::Status { output } => run_status(&cfg, &output)?,
        }

        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<SkyfetchConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => config::load_or_init(),
    }
}

#[cfg(test)]
mod tests;

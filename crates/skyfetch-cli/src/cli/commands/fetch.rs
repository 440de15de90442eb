//! `skyfetch fetch` – download cutouts for a catalog table.

use anyhow::{Context, Result};
use skyfetch_core::config::SkyfetchConfig;
use skyfetch_core::fetch::CurlFetcher;
use skyfetch_core::monitor::{Priority, ProcProbe, ResourceMonitor};
use skyfetch_core::{source, Orchestrator, ProgressStats, RunOptions, RunReport};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct FetchArgs {
    pub table: PathBuf,
    pub object: Option<String>,
    pub output: PathBuf,
    pub radii_default: u32,
    pub priority: f64,
}

pub async fn run_fetch(cfg: &SkyfetchConfig, args: FetchArgs) -> Result<()> {
    if args.radii_default == 0 {
        anyhow::bail!("--radii-default must be at least 1");
    }
    let rows = source::load_rows(&args.table, args.object.as_deref())
        .with_context(|| format!("failed to load catalog {}", args.table.display()))?;
    if rows.is_empty() {
        match &args.object {
            Some(id) => println!("No rows match object {:?}.", id),
            None => println!("Catalog is empty."),
        }
        return Ok(());
    }

    let priority = Priority::new(args.priority);
    if priority.value() != args.priority {
        tracing::warn!(requested = args.priority, used = priority.value(), "priority clamped");
    }
    let mut opts = RunOptions::from_config(cfg, args.output);
    opts.priority = priority;
    opts.default_radii = args.radii_default;

    let monitor = Arc::new(ResourceMonitor::new(
        priority,
        cfg.monitor(),
        Box::new(ProcProbe::new()),
    ));
    let orchestrator = Orchestrator::new(opts, Arc::new(CurlFetcher::new()), monitor);

    println!(
        "Fetching {} cutout(s) into {} with {} worker(s)",
        rows.len(),
        orchestrator.options().output_dir.display(),
        priority.worker_count()
    );

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    let progress_handle = tokio::spawn(async move {
        while let Some(stats) = progress_rx.recv().await {
            let eta = stats
                .eta_secs()
                .map(|s| format!("{:.0}s", s))
                .unwrap_or_else(|| "?".to_string());
            println!(
                "  {}/{} ({:.1}%)  {} ok  {} failed  {:.2} jobs/s  ETA {}",
                stats.completed,
                stats.total,
                stats.fraction() * 100.0,
                stats.succeeded,
                stats.failed,
                stats.jobs_per_sec(),
                eta
            );
        }
    });

    let report = orchestrator.run(rows, Some(progress_tx)).await?;
    let _ = progress_handle.await;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!(
        "Done: {} requested, {} already present, {} downloaded, {} failed",
        report.requested, report.already_present, report.succeeded, report.failed
    );
    if report.unrecorded > 0 {
        println!(
            "Warning: {} file(s) written but not checkpointed; they will be skipped by file on the next run",
            report.unrecorded
        );
    }
    if let Some(path) = &report.failures_path {
        println!("Failed objects written to {}", path.display());
    }
}

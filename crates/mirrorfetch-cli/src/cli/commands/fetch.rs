//! `mirrorfetch fetch` – download every task of a manifest.

use anyhow::Result;
use mirrorfetch_core::batch::{BatchDownloader, ProgressUpdate};
use mirrorfetch_core::config::MirrorfetchConfig;
use mirrorfetch_core::error::BatchError;
use mirrorfetch_core::fetch::CurlFetcher;
use mirrorfetch_core::task;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the batch. Returns the exit code: 0 on success, 2 if some files
/// failed, 3 if a file marked not downloadable is missing, 130 if interrupted.
pub async fn run_fetch(
    cfg: &MirrorfetchConfig,
    manifest: &Path,
    base_dir: &Path,
    jobs: Option<usize>,
    failed_out: Option<&Path>,
) -> Result<i32> {
    let tasks = task::load_manifest(manifest, base_dir)?;
    if tasks.is_empty() {
        println!("Manifest has no tasks.");
        return Ok(0);
    }
    let jobs = jobs.unwrap_or(cfg.max_concurrent_downloads);
    tracing::info!(tasks = tasks.len(), jobs, manifest = %manifest.display(), "starting batch");

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted, cancelling downloads...");
                cancel.cancel();
            }
        }
    });

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressUpdate>(16);
    let progress_handle = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            let rate = match &update {
                ProgressUpdate::Running(stats) => {
                    format!("  {:.2} MiB/s", stats.bytes_per_sec() / 1_048_576.0)
                }
                ProgressUpdate::Complete { .. } => String::new(),
            };
            print!(
                "\r  {} ({:.1}%){}  ",
                update.message(),
                update.fraction() * 100.0,
                rate
            );
            let _ = std::io::stdout().flush();
        }
        println!();
    });

    let downloader = BatchDownloader::new(
        Arc::new(CurlFetcher::new(cfg.curl_options())),
        cfg.mirror_table(),
        Arc::new(cfg.clone()),
    )
    .with_source_delays(cfg.source_delays())
    .with_report_interval(cfg.progress_interval())
    .with_progress(Arc::new(progress_tx));

    let result = downloader.run(tasks, jobs, &cancel).await;
    drop(downloader);
    let _ = progress_handle.await;
    ctrl_c.abort();

    match result {
        Ok(summary) => {
            println!(
                "Downloaded {} file(s), {:.1} MiB in {:.1}s ({} needed a retry).",
                summary.files,
                summary.bytes as f64 / 1_048_576.0,
                summary.elapsed.as_secs_f64(),
                summary.retried
            );
            Ok(0)
        }
        Err(BatchError::Cancelled) => {
            println!("Cancelled.");
            Ok(130)
        }
        Err(BatchError::Failed { tasks }) => {
            println!("{} file(s) failed to download:", tasks.len());
            for t in &tasks {
                println!("  {}  ({})", t.target_path.display(), t.canonical_url);
            }
            if let Some(out) = failed_out {
                task::save_manifest(out, &tasks)?;
                println!("Wrote failed tasks to {}", out.display());
            }
            Ok(2)
        }
        Err(e @ BatchError::NotFound { .. }) => {
            println!("Download aborted: {}", e);
            if let Some(cause) = std::error::Error::source(&e) {
                println!("  {}", cause);
            }
            Ok(3)
        }
    }
}

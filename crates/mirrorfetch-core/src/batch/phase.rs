//! One pass over a task list: bounded workers plus the reporting loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::progress::{Phase, ProgressSink, ProgressUpdate};
use super::state::BatchState;
use super::worker::{download_one, TaskOutcome, WorkerContext};
use crate::error::BatchError;
use crate::task::DownloadTask;

/// Result of a phase that was not cancelled.
#[derive(Debug)]
pub(crate) struct PhaseOutcome {
    pub(crate) completed: usize,
    pub(crate) bytes: u64,
    /// Failed tasks in their original order.
    pub(crate) failed: Vec<DownloadTask>,
}

pub(crate) async fn run_phase(
    ctx: &Arc<WorkerContext>,
    progress: &dyn ProgressSink,
    report_interval: Duration,
    phase: Phase,
    tasks: Vec<DownloadTask>,
    concurrency_limit: usize,
    cancel: &CancellationToken,
) -> Result<PhaseOutcome, BatchError> {
    let total = tasks.len();
    let state = Arc::new(BatchState::new(phase, total));
    let phase_cancel = cancel.child_token();
    let permits = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    tracing::info!(?phase, total, concurrency_limit, "starting download phase");

    let mut join_set = JoinSet::new();
    for (index, task) in tasks.iter().cloned().enumerate() {
        let ctx = Arc::clone(ctx);
        let state = Arc::clone(&state);
        let permits = Arc::clone(&permits);
        let token = phase_cancel.clone();
        join_set.spawn(async move {
            // The semaphore is never closed; holding the Ok value holds the permit.
            let _permit = tokio::select! {
                biased;
                _ = token.cancelled() => return (index, TaskOutcome::Cancelled),
                permit = permits.acquire_owned() => permit,
            };
            let outcome = download_one(&ctx, task, &state, &token).await;
            (index, outcome)
        });
    }

    progress.update(ProgressUpdate::Running(state.snapshot()));
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + report_interval,
        report_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut reported = vec![false; total];
    let mut failed_indices = Vec::new();
    let mut abort: Option<BatchError> = None;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abort = Some(BatchError::Cancelled);
                break;
            }
            joined = join_set.join_next() => match joined {
                None => break,
                Some(Ok((index, outcome))) => {
                    reported[index] = true;
                    match outcome {
                        TaskOutcome::Done { bytes } => {
                            tracing::trace!(path = %tasks[index].target_path.display(), bytes, "task done");
                        }
                        TaskOutcome::Failed(err) => {
                            tracing::warn!(
                                path = %tasks[index].target_path.display(),
                                url = %tasks[index].canonical_url,
                                "download failed: {}", err
                            );
                            failed_indices.push(index);
                        }
                        TaskOutcome::NotFound(err) => {
                            tracing::error!(
                                path = %tasks[index].target_path.display(),
                                "required file not found on any source: {}", err
                            );
                            abort = Some(BatchError::NotFound {
                                task: Box::new(tasks[index].clone()),
                                source: err,
                            });
                            break;
                        }
                        TaskOutcome::Cancelled => {
                            tracing::debug!(
                                path = %tasks[index].target_path.display(),
                                "unit cancelled itself"
                            );
                            abort = Some(BatchError::Cancelled);
                            break;
                        }
                    }
                }
                Some(Err(e)) => tracing::warn!("download worker ended abnormally: {}", e),
            },
            _ = ticker.tick() => progress.update(ProgressUpdate::Running(state.snapshot())),
        }
    }

    if let Some(err) = abort {
        phase_cancel.cancel();
        join_set.abort_all();
        while join_set.join_next().await.is_some() {}
        tracing::info!(?phase, "download phase aborted: {}", err);
        return Err(err);
    }

    // A worker that panicked never reported; treat its task as failed.
    failed_indices.extend(
        reported
            .iter()
            .enumerate()
            .filter(|(_, seen)| !**seen)
            .map(|(i, _)| i),
    );
    failed_indices.sort_unstable();
    let failed: Vec<DownloadTask> = failed_indices.into_iter().map(|i| tasks[i].clone()).collect();

    progress.update(ProgressUpdate::Running(state.snapshot()));
    let outcome = PhaseOutcome {
        completed: state.completed_count(),
        bytes: state.completed_bytes(),
        failed,
    };
    tracing::info!(
        ?phase,
        completed = outcome.completed,
        failed = outcome.failed.len(),
        "download phase finished"
    );
    Ok(outcome)
}

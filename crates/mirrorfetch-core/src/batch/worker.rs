//! One download unit: resolve candidates, run them in order, update counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::state::BatchState;
use crate::error::{FallbackError, SourceFailure};
use crate::fallback::run_ordered;
use crate::fetch::{ByteSink, FetchError, VerifiedFetch};
use crate::mirror::MirrorTable;
use crate::settings::SettingsProvider;
use crate::sources::{operation, Operation, SourceListBuilder, SourceTag};
use crate::task::DownloadTask;

/// Everything a unit needs, shared by all units of a batch.
pub(crate) struct WorkerContext {
    pub(crate) fetcher: Arc<dyn VerifiedFetch>,
    pub(crate) table: Arc<MirrorTable>,
    pub(crate) settings: Arc<dyn SettingsProvider>,
    pub(crate) sources: SourceListBuilder,
}

#[derive(Debug)]
pub(crate) enum TaskOutcome {
    Done { bytes: u64 },
    Failed(FallbackError),
    /// A task that is not downloadable was missing from every source.
    NotFound(FallbackError),
    Cancelled,
}

pub(crate) async fn download_one(
    ctx: &WorkerContext,
    task: DownloadTask,
    state: &Arc<BatchState>,
    cancel: &CancellationToken,
) -> TaskOutcome {
    let settings = ctx.settings.as_ref();
    let url = task.canonical_url.clone();
    let content = ctx.table.content_kind(&url, settings);
    let candidates = ctx.table.tagged_candidates(&url, settings);

    let received = Arc::new(AtomicU64::new(0));
    let on_bytes: ByteSink = {
        let received = Arc::clone(&received);
        let state = Arc::clone(state);
        Arc::new(move |n| {
            received.fetch_add(n, Ordering::Relaxed);
            state.add_in_flight(n);
        })
    };

    let downloadable = task.downloadable;
    let task = Arc::new(task);
    let operations: Vec<(SourceTag, Operation<u64>)> = candidates
        .into_iter()
        .map(|(tag, candidate_url)| {
            let fetcher = Arc::clone(&ctx.fetcher);
            let task = Arc::clone(&task);
            let on_bytes = Arc::clone(&on_bytes);
            let cancel = cancel.clone();
            let op = operation(move || async move {
                fetcher
                    .fetch(&candidate_url, &task, on_bytes, cancel)
                    .await
                    .map_err(SourceFailure::from)
            });
            (tag, op)
        })
        .collect();

    let sources = ctx
        .sources
        .build(settings.preference_policy(), content, operations);
    let result = run_ordered(sources, cancel).await;
    state.release_in_flight(received.load(Ordering::Relaxed));

    match result {
        Ok(bytes) => {
            state.record_success(bytes);
            TaskOutcome::Done { bytes }
        }
        Err(e) if e.is_cancelled() => TaskOutcome::Cancelled,
        Err(e) if !downloadable && last_error_is_not_found(&e) => TaskOutcome::NotFound(e),
        Err(e) => TaskOutcome::Failed(e),
    }
}

fn last_error_is_not_found(err: &FallbackError) -> bool {
    match err {
        FallbackError::NoSourceSucceeded { source, .. } => {
            matches!(source.downcast_ref::<FetchError>(), Some(FetchError::NotFound { .. }))
        }
        _ => false,
    }
}

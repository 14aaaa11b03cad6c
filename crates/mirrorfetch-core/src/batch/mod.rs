//! Bounded batch downloader.
//!
//! Runs many independent [`DownloadTask`]s under a concurrency ceiling. Each
//! task resolves its candidate URLs through the mirror table, orders them
//! with the source list builder and tries them with the fallback executor.
//! Tasks that still fail after the initial phase get exactly one retry pass;
//! whatever fails again is returned in [`BatchError::Failed`].

mod phase;
mod progress;
mod state;
mod worker;

pub use progress::{NoProgress, Phase, ProgressSink, ProgressStats, ProgressUpdate};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::BatchError;
use crate::fetch::VerifiedFetch;
use crate::mirror::MirrorTable;
use crate::settings::SettingsProvider;
use crate::sources::{SourceDelays, SourceListBuilder};
use crate::task::DownloadTask;
use worker::WorkerContext;

/// Default number of concurrently running download units.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Default period of progress reports while a phase runs.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// What a successful batch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    /// Bytes of all files, including ones that were already present.
    pub bytes: u64,
    /// Tasks that needed the retry pass (and then succeeded).
    pub retried: usize,
    pub elapsed: Duration,
}

pub struct BatchDownloader {
    fetcher: Arc<dyn VerifiedFetch>,
    table: Arc<MirrorTable>,
    settings: Arc<dyn SettingsProvider>,
    sources: SourceListBuilder,
    progress: Arc<dyn ProgressSink>,
    report_interval: Duration,
}

impl BatchDownloader {
    pub fn new(
        fetcher: Arc<dyn VerifiedFetch>,
        table: MirrorTable,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            fetcher,
            table: Arc::new(table),
            settings,
            sources: SourceListBuilder::default(),
            progress: Arc::new(NoProgress),
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Replaces the pre-attempt delays used when building candidate lists.
    pub fn with_source_delays(mut self, delays: SourceDelays) -> Self {
        self.sources = SourceListBuilder::new(delays);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Period of progress reports. Clamped to at least 1 ms.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn mirror_table(&self) -> &MirrorTable {
        &self.table
    }

    /// Downloads `tasks` with at most `concurrency_limit` (min 1) units running.
    ///
    /// Returns [`BatchError::Cancelled`] once `cancel` fires (after every unit
    /// has unwound), or [`BatchError::Failed`] with the tasks that failed in
    /// both the initial and the retry phase.
    pub async fn run(
        &self,
        tasks: Vec<DownloadTask>,
        concurrency_limit: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, BatchError> {
        let started = Instant::now();
        let limit = concurrency_limit.max(1);
        let files = tasks.len();
        let ctx = Arc::new(WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            table: Arc::clone(&self.table),
            settings: Arc::clone(&self.settings),
            sources: self.sources,
        });

        let initial = phase::run_phase(
            &ctx,
            self.progress.as_ref(),
            self.report_interval,
            Phase::Initial,
            tasks,
            limit,
            cancel,
        )
        .await?;

        let mut bytes = initial.bytes;
        let mut retried = 0;
        if !initial.failed.is_empty() {
            retried = initial.failed.len();
            tracing::info!(count = retried, "retrying failed downloads");
            let retry = phase::run_phase(
                &ctx,
                self.progress.as_ref(),
                self.report_interval,
                Phase::Retry,
                initial.failed,
                limit,
                cancel,
            )
            .await?;
            bytes += retry.bytes;
            if !retry.failed.is_empty() {
                return Err(BatchError::Failed {
                    tasks: retry.failed,
                });
            }
        }

        self.progress.update(ProgressUpdate::Complete { files, bytes });
        Ok(BatchSummary {
            files,
            bytes,
            retried,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests;

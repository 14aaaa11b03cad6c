//! Error and result types shared by the fallback executor and the batch downloader.
//!
//! Cancellation is its own variant at every level so it can never be mistaken
//! for an ordinary failure: it is re-raised untouched, never retried and never
//! recorded in a failed set.

use thiserror::Error;

use crate::sources::SourceTag;
use crate::task::DownloadTask;

/// Type-erased error carried by a failed attempt.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single failed attempt against one source.
#[derive(Debug, Error)]
pub enum SourceFailure {
    /// The attempt observed cancellation. Not a failure.
    #[error("operation cancelled")]
    Cancelled,
    /// Network error, bad status, checksum mismatch, ...
    #[error(transparent)]
    Failed(BoxError),
}

impl SourceFailure {
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        SourceFailure::Failed(err.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SourceFailure::Cancelled)
    }
}

/// Error returned by [`crate::fallback::run_ordered`].
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("operation cancelled")]
    Cancelled,
    /// The candidate list was empty, so nothing was attempted.
    #[error("no source was attempted: empty candidate list")]
    NoSources,
    /// Every source failed; carries the error of the last one tried.
    #[error("no source succeeded (last tried {tag}): {source}")]
    NoSourceSucceeded {
        tag: SourceTag,
        #[source]
        source: BoxError,
    },
}

impl FallbackError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FallbackError::Cancelled)
    }
}

/// Error returned by [`crate::batch::BatchDownloader::run`].
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch download cancelled")]
    Cancelled,
    /// Tasks still failing after the retry pass.
    #[error("{} file(s) failed to download after retry", tasks.len())]
    Failed { tasks: Vec<DownloadTask> },
    /// A task marked not downloadable was not found on any source. Ends the
    /// batch at once instead of going through the retry pass.
    #[error("{} is not available from any source", task.target_path.display())]
    NotFound {
        task: Box<DownloadTask>,
        #[source]
        source: FallbackError,
    },
}

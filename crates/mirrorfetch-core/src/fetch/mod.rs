//! Verified single-file fetch primitive.
//!
//! The batch downloader only knows [`VerifiedFetch`]; [`CurlFetcher`] is the
//! default implementation. A fetch either leaves a complete, verified file at
//! the task's target path or leaves nothing behind.

mod http;
mod verify;

pub use http::{CurlFetcher, CurlOptions};
pub use verify::{existing_is_valid, verify_file};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, SourceFailure};
use crate::task::DownloadTask;

/// Receives the size of every chunk written while a transfer runs.
pub type ByteSink = Arc<dyn Fn(u64) + Send + Sync>;

/// A sink that drops byte reports.
pub fn discard_bytes() -> ByteSink {
    Arc::new(|_| {})
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,
    #[error("GET {url} returned HTTP {code} (not found)")]
    NotFound { url: String, code: u32 },
    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },
    #[error("transfer failed: {0}")]
    Curl(#[from] curl::Error),
    #[error("partial transfer: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Local storage or hashing failure.
    #[error(transparent)]
    Local(BoxError),
}

impl FetchError {
    pub(crate) fn local(err: anyhow::Error) -> Self {
        FetchError::Local(err.into())
    }

    /// Maps a non-2xx status to `NotFound` or `Http`.
    pub fn from_status(url: &str, code: u32) -> Self {
        match code {
            404 | 410 => FetchError::NotFound {
                url: url.to_string(),
                code,
            },
            _ => FetchError::Http {
                url: url.to_string(),
                code,
            },
        }
    }
}

impl From<FetchError> for SourceFailure {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => SourceFailure::Cancelled,
            other => SourceFailure::failed(other),
        }
    }
}

/// Downloads one URL to a task's target path and verifies it.
#[async_trait]
pub trait VerifiedFetch: Send + Sync {
    /// Fetches `url` into `task.target_path`. Returns the size of the file on disk.
    ///
    /// Must return [`FetchError::Cancelled`] (and clean up its temp file) once
    /// `cancel` fires, and must never leave a partial file at the target path.
    async fn fetch(
        &self,
        url: &str,
        task: &DownloadTask,
        on_bytes: ByteSink,
        cancel: CancellationToken,
    ) -> Result<u64, FetchError>;
}

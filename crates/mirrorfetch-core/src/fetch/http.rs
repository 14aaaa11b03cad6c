//! Default fetcher: one libcurl GET per attempt on the blocking pool.

use async_trait::async_trait;
use curl::easy::Easy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::verify::{existing_is_valid, verify_file};
use super::{ByteSink, FetchError, VerifiedFetch};
use crate::storage::{self, StorageWriter, StorageWriterBuilder};
use crate::task::DownloadTask;

/// Transfer limits and verification switch for [`CurlFetcher`].
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when slower than this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub timeout: Duration,
    pub verify_integrity: bool,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            verify_integrity: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    options: CurlOptions,
}

impl CurlFetcher {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CurlOptions {
        &self.options
    }
}

#[async_trait]
impl VerifiedFetch for CurlFetcher {
    async fn fetch(
        &self,
        url: &str,
        task: &DownloadTask,
        on_bytes: ByteSink,
        cancel: CancellationToken,
    ) -> Result<u64, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let url = url.to_string();
        let task = task.clone();
        let options = self.options;
        tokio::task::spawn_blocking(move || {
            fetch_blocking(&url, &task, &on_bytes, &cancel, options)
        })
        .await
        .map_err(|e| FetchError::Local(e.into()))?
    }
}

fn fetch_blocking(
    url: &str,
    task: &DownloadTask,
    on_bytes: &ByteSink,
    cancel: &CancellationToken,
    options: CurlOptions,
) -> Result<u64, FetchError> {
    let target = task.target_path.as_path();
    if existing_is_valid(task, options.verify_integrity).map_err(FetchError::local)? {
        let len = std::fs::metadata(target)?.len();
        tracing::debug!(path = %target.display(), "already present, skipping");
        return Ok(len);
    }
    if target.is_file() {
        tracing::debug!(path = %target.display(), "removing existing file that failed verification");
        std::fs::remove_file(target)?;
    }

    // A known checksum earns one more try against the same URL when the body
    // arrives but does not match.
    let attempts = if task.expected_checksum.is_some() { 2 } else { 1 };
    let mut attempt = 1;
    loop {
        match download_to_target(url, task, on_bytes, cancel, options) {
            Err(FetchError::ChecksumMismatch { expected, actual, .. }) if attempt < attempts => {
                tracing::debug!(url, %expected, %actual, attempt, "checksum mismatch, fetching again");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// One GET of `url` into a temp file, verified and renamed onto the target.
fn download_to_target(
    url: &str,
    task: &DownloadTask,
    on_bytes: &ByteSink,
    cancel: &CancellationToken,
    options: CurlOptions,
) -> Result<u64, FetchError> {
    let target = task.target_path.as_path();
    let temp = storage::temp_path(target);
    let mut builder = StorageWriterBuilder::create(&temp).map_err(FetchError::local)?;
    if let Some(n) = task.expected_size {
        if let Err(e) = builder.preallocate(n) {
            builder.build().discard();
            return Err(FetchError::local(e));
        }
    }
    let writer = builder.build();

    let result = transfer(url, &writer, on_bytes, cancel, options).and_then(|written| {
        writer.sync().map_err(FetchError::local)?;
        verify_file(writer.temp_path(), written, task)?;
        Ok(written)
    });
    match result {
        Ok(written) => {
            writer.finalize(target).map_err(FetchError::local)?;
            tracing::debug!(url, path = %target.display(), bytes = written, "fetched");
            Ok(written)
        }
        Err(e) => {
            writer.discard();
            Err(e)
        }
    }
}

/// Streams the body of `url` into `writer`. Returns the number of bytes written.
fn transfer(
    url: &str,
    writer: &StorageWriter,
    on_bytes: &ByteSink,
    cancel: &CancellationToken,
    options: CurlOptions,
) -> Result<u64, FetchError> {
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.useragent(concat!("mirrorfetch/", env!("CARGO_PKG_VERSION")))?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.fail_on_error(true)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.low_speed_limit(options.low_speed_limit)?;
    easy.low_speed_time(options.low_speed_time)?;
    easy.timeout(options.timeout)?;
    easy.progress(true)?;

    let sink = writer.clone();
    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if cancel.is_cancelled() {
                return Ok(0); // abort transfer
            }
            match sink.append(data) {
                Ok(()) => {
                    on_bytes(data.len() as u64);
                    Ok(data.len())
                }
                Err(e) => {
                    tracing::warn!("download write failed: {}", e);
                    Ok(0)
                }
            }
        })?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()
    };

    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    if let Err(e) = performed {
        if e.is_http_returned_error() {
            let code = easy.response_code()?;
            return Err(FetchError::from_status(url, code));
        }
        return Err(e.into());
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::from_status(url, code));
    }
    Ok(writer.written())
}

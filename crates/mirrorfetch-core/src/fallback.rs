//! Ordered fallback executor.
//!
//! Tries candidates strictly one after another: a candidate is only started
//! after the previous one has failed, its `pre_delay` is waited first, and the
//! first success wins. Cancellation preempts both the delay and a running
//! operation and is reported as [`FallbackError::Cancelled`], never as a failure.

use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, FallbackError, SourceFailure};
use crate::sources::{CandidateSource, SourceTag};

/// Runs `sources` in list order and returns the first successful value.
///
/// If every source fails the error of the *last* one is returned inside
/// [`FallbackError::NoSourceSucceeded`]. An empty list yields
/// [`FallbackError::NoSources`].
pub async fn run_ordered<T>(
    sources: Vec<CandidateSource<T>>,
    cancel: &CancellationToken,
) -> Result<T, FallbackError> {
    let mut last_error: Option<(SourceTag, BoxError)> = None;

    for source in sources {
        if cancel.is_cancelled() {
            return Err(FallbackError::Cancelled);
        }
        if !source.pre_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FallbackError::Cancelled),
                _ = tokio::time::sleep(source.pre_delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(FallbackError::Cancelled);
        }

        let attempt = (source.operation)();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FallbackError::Cancelled),
            r = attempt => r,
        };

        match result {
            Ok(value) => return Ok(value),
            Err(SourceFailure::Cancelled) => return Err(FallbackError::Cancelled),
            Err(SourceFailure::Failed(err)) => {
                tracing::debug!(source = %source.tag, error = %err, "source failed, trying next");
                last_error = Some((source.tag, err));
            }
        }
    }

    match last_error {
        Some((tag, source)) => Err(FallbackError::NoSourceSucceeded { tag, source }),
        None => Err(FallbackError::NoSources),
    }
}

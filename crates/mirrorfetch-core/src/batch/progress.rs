//! Progress reporting for batch downloads.
//!
//! The coordinator pushes a [`ProgressUpdate`] at phase start, on every report
//! tick and when a phase drained. Consumers can compute rate as
//! `bytes_done / elapsed_secs`.

/// Which pass of the batch is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    /// The single retry pass over tasks that failed in the initial phase.
    Retry,
}

/// Snapshot of one phase's counters.
///
/// Each counter is read independently; no consistency between them is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub phase: Phase,
    /// Tasks of this phase that finished successfully.
    pub completed: usize,
    /// Number of tasks in this phase.
    pub total: usize,
    /// Bytes of finished tasks.
    pub bytes_done: u64,
    /// Bytes received by transfers still running.
    pub bytes_in_flight: u64,
    /// Seconds since the phase started.
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Fraction of tasks complete in [0.0, 1.0]. An empty phase counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }

    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        (self.bytes_done + self.bytes_in_flight) as f64 / self.elapsed_secs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    Running(ProgressStats),
    /// Every task of the batch is present and verified.
    Complete { files: usize, bytes: u64 },
}

impl ProgressUpdate {
    pub fn fraction(&self) -> f64 {
        match self {
            ProgressUpdate::Running(stats) => stats.fraction(),
            ProgressUpdate::Complete { .. } => 1.0,
        }
    }

    /// One-line human-readable status.
    pub fn message(&self) -> String {
        match self {
            ProgressUpdate::Running(stats) => {
                let verb = match stats.phase {
                    Phase::Initial => "Downloading",
                    Phase::Retry => "Retrying",
                };
                format!(
                    "{} {}/{} files, {:.1} MiB",
                    verb,
                    stats.completed,
                    stats.total,
                    stats.bytes_done as f64 / 1_048_576.0
                )
            }
            ProgressUpdate::Complete { files, bytes } => format!(
                "Downloaded {} files, {:.1} MiB",
                files,
                *bytes as f64 / 1_048_576.0
            ),
        }
    }
}

/// Receives progress updates. Called from the coordinator task; must not block.
pub trait ProgressSink: Send + Sync {
    fn update(&self, update: ProgressUpdate);
}

/// Drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _update: ProgressUpdate) {}
}

/// Forwards updates to a channel; an update is dropped when the channel is full.
impl ProgressSink for tokio::sync::mpsc::Sender<ProgressUpdate> {
    fn update(&self, update: ProgressUpdate) {
        let _ = self.try_send(update);
    }
}

//! Per-phase counters shared between workers and the reporter.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use super::progress::{Phase, ProgressStats};

/// Counters of one phase. A new value is created for every phase, which is
/// how counters reset between the initial and the retry pass.
#[derive(Debug)]
pub(crate) struct BatchState {
    phase: Phase,
    total: usize,
    started: Instant,
    completed_count: AtomicUsize,
    completed_bytes: AtomicU64,
    in_flight_bytes: AtomicU64,
}

impl BatchState {
    pub(crate) fn new(phase: Phase, total: usize) -> Self {
        Self {
            phase,
            total,
            started: Instant::now(),
            completed_count: AtomicUsize::new(0),
            completed_bytes: AtomicU64::new(0),
            in_flight_bytes: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_success(&self, bytes: u64) {
        self.completed_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.completed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_in_flight(&self, bytes: u64) {
        self.in_flight_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Removes a finished transfer's bytes from the in-flight total.
    pub(crate) fn release_in_flight(&self, bytes: u64) {
        self.in_flight_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub(crate) fn completed_count(&self) -> usize {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub(crate) fn completed_bytes(&self) -> u64 {
        self.completed_bytes.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self) -> ProgressStats {
        ProgressStats {
            phase: self.phase,
            completed: self.completed_count(),
            total: self.total,
            bytes_done: self.completed_bytes(),
            bytes_in_flight: self.in_flight_bytes.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

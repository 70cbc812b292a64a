use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the store's persistence side effects.
/// All metrics are atomic counters shared between store handles.
#[derive(Clone, Default)]
pub struct Metrics {
    /// Snapshots written successfully
    pub persist_writes: Arc<AtomicU64>,
    /// Snapshots that failed to write
    pub persist_failures: Arc<AtomicU64>,
    /// Snapshots dropped because a newer one was already written
    pub persist_stale_skips: Arc<AtomicU64>,
    /// Completion events accepted (including repeats)
    pub lessons_completed: Arc<AtomicU64>,
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub persist_writes: u64,
    pub persist_failures: u64,
    pub persist_stale_skips: u64,
    pub lessons_completed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_persist_write(&self) {
        self.persist_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_skip(&self) {
        self.persist_stale_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lesson_completed(&self) {
        self.lessons_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            persist_writes: self.persist_writes.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            persist_stale_skips: self.persist_stale_skips.load(Ordering::Relaxed),
            lessons_completed: self.lessons_completed.load(Ordering::Relaxed),
        }
    }
}

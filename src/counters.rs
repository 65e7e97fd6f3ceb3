// Shared byte counters, written by the capture thread and drained by the
// aggregator task

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-window downstream/upstream byte totals.
///
/// Both sides touch this concurrently: the classifier adds from the capture
/// thread while the aggregator drains from the timer task. Each counter is
/// drained with a single atomic swap, so a frame recorded during a window
/// rollover lands in exactly one window.
#[derive(Debug, Default)]
pub struct ByteCounters {
    downstream: AtomicU64,
    upstream: AtomicU64,
}

impl ByteCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_downstream(&self, bytes: u64) {
        self.downstream.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_upstream(&self, bytes: u64) {
        self.upstream.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Read and zero both counters in one atomic handoff per counter.
    /// Returns `(downstream, upstream)` totals for the window just ended.
    pub fn take(&self) -> (u64, u64) {
        (
            self.downstream.swap(0, Ordering::Relaxed),
            self.upstream.swap(0, Ordering::Relaxed),
        )
    }
}

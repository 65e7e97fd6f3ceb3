// Windowed rate aggregation and status-line rendering

use crate::counters::ByteCounters;
use std::sync::Arc;
use std::time::Duration;

/// Format bytes as human-readable string (e.g., "1.5 MB", "500 KB")
///
/// Binary units (1024-based) with one decimal place above the byte range.
pub fn human_readable(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Turns windowed byte totals into a per-second status line.
///
/// Each tick drains the shared counters and scales the totals by
/// `1 second / interval`. The normaliser is an integer, so intervals that do
/// not evenly divide one second round down; intervals of a second or longer
/// report the raw window total.
pub struct RateAggregator {
    counters: Arc<ByteCounters>,
    normaliser: u64,
}

impl RateAggregator {
    pub fn new(counters: Arc<ByteCounters>, interval: Duration) -> Self {
        let normaliser =
            (Duration::from_secs(1).as_millis() / interval.as_millis().max(1)).max(1) as u64;
        Self {
            counters,
            normaliser,
        }
    }

    /// Drain the counters for the window that just ended and render the
    /// status line. Resets both counters as a side effect.
    pub fn tick(&self) -> String {
        let (down, up) = self.counters.take();
        let down_rate = down * self.normaliser;
        let up_rate = up * self.normaliser;

        log::debug!("window totals: down={} up={}", down, up);

        format!(
            "Down: {} Up: {}",
            human_readable(down_rate),
            human_readable(up_rate)
        )
    }
}

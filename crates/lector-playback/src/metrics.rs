//! Counters shared between the orchestrator and its observers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Playback pipeline counters.
///
/// Cloning shares the underlying atomics, so any clone sees updates from the
/// running orchestrator.
#[derive(Clone, Debug, Default)]
pub struct PlaybackMetrics {
    /// Preload fetches kicked off.
    pub preloads_started: Arc<AtomicU64>,
    /// Paragraph transitions served from a completed preload.
    pub preload_hits: Arc<AtomicU64>,
    /// Transitions that waited on a preload still in flight.
    pub preload_pending_hits: Arc<AtomicU64>,
    /// Transitions that found no usable preload and fetched fresh.
    pub preload_misses: Arc<AtomicU64>,
    /// Preload fetches that failed.
    pub preload_failures: Arc<AtomicU64>,
    /// Synthesis requests that failed during an explicit or automatic load.
    pub synthesis_failures: Arc<AtomicU64>,
    /// Automatic advances to a next paragraph.
    pub auto_advances: Arc<AtomicU64>,
    /// Highlight ticks processed while playing.
    pub ticks: Arc<AtomicU64>,
}

impl PlaybackMetrics {
    pub fn record_preload_started(&self) {
        self.preloads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_hit(&self) {
        self.preload_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_pending_hit(&self) {
        self.preload_pending_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_miss(&self) {
        self.preload_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_preload_failure(&self) {
        self.preload_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_synthesis_failure(&self) {
        self.synthesis_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auto_advance(&self) {
        self.auto_advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = PlaybackMetrics::default();
        let clone = metrics.clone();

        metrics.record_preload_hit();
        metrics.record_preload_hit();
        clone.record_auto_advance();

        assert_eq!(clone.preload_hits.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.auto_advances.load(Ordering::Relaxed), 1);
    }
}

//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for cache operations.
///
/// All counters are atomic and can be read from any thread.
#[derive(Debug, Default)]
pub struct CacheStats {
    snapshots_set: AtomicU64,
    snapshots_rejected: AtomicU64,
    snapshot_hits: AtomicU64,
    snapshot_misses: AtomicU64,
    snapshots_cleared: AtomicU64,
    watches_created: AtomicU64,
    notifications_sent: AtomicU64,
}

impl CacheStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_set(&self) {
        self.snapshots_set.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("flowc_snapshots_published_total").increment(1);
    }

    #[inline]
    pub(crate) fn record_rejection(&self) {
        self.snapshots_rejected.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("flowc_snapshot_rejections_total").increment(1);
    }

    #[inline]
    pub(crate) fn record_hit(&self) {
        self.snapshot_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.snapshot_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_clear(&self) {
        self.snapshots_cleared.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_watch(&self) {
        self.watches_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_notification(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshots accepted.
    #[inline]
    pub fn snapshots_set(&self) -> u64 {
        self.snapshots_set.load(Ordering::Relaxed)
    }

    /// Snapshots refused (version regression or failed consistency).
    #[inline]
    pub fn snapshots_rejected(&self) -> u64 {
        self.snapshots_rejected.load(Ordering::Relaxed)
    }

    /// Lookups that found a snapshot.
    #[inline]
    pub fn snapshot_hits(&self) -> u64 {
        self.snapshot_hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing.
    #[inline]
    pub fn snapshot_misses(&self) -> u64 {
        self.snapshot_misses.load(Ordering::Relaxed)
    }

    /// Snapshots cleared.
    #[inline]
    pub fn snapshots_cleared(&self) -> u64 {
        self.snapshots_cleared.load(Ordering::Relaxed)
    }

    /// Watches handed out.
    #[inline]
    pub fn watches_created(&self) -> u64 {
        self.watches_created.load(Ordering::Relaxed)
    }

    /// Watch channel updates that changed the watched value.
    #[inline]
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Hit rate in `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.snapshot_hits() as f64;
        let total = hits + self.snapshot_misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.snapshots_set,
            &self.snapshots_rejected,
            &self.snapshot_hits,
            &self.snapshot_misses,
            &self.snapshots_cleared,
            &self.watches_created,
            &self.notifications_sent,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_hit_rate() {
        let stats = CacheStats::new();

        stats.record_set();
        stats.record_rejection();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert_eq!(stats.snapshots_set(), 1);
        assert_eq!(stats.snapshots_rejected(), 1);
        assert_eq!(stats.snapshot_hits(), 2);
        assert_eq!(stats.snapshot_misses(), 1);
        assert!((stats.hit_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn reset_zeroes_everything() {
        let stats = CacheStats::new();
        stats.record_set();
        stats.record_watch();
        stats.reset();
        assert_eq!(stats.snapshots_set(), 0);
        assert_eq!(stats.watches_created(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }
}

//! Cache trait and ShardedCache implementation.
//!
//! The cache stores one snapshot per node. [`ShardedCache`] keeps them in a
//! `DashMap` and wakes the node's watches after every accepted update.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fnv::FnvBuildHasher;
use flowc_core::{FlowcError, FlowcResult, NodeId};
use tracing::{debug, trace, warn};

use crate::snapshot::Snapshot;
use crate::stats::CacheStats;
use crate::watch::{SnapshotWatch, WatchManager};

/// Storage for per-node snapshots.
pub trait Cache: Send + Sync {
    /// Snapshot currently held for `node`.
    fn get_snapshot(&self, node: &NodeId) -> Option<Arc<Snapshot>>;

    /// Replace the snapshot for `node` and wake its watches.
    ///
    /// Fails when `snapshot` is not newer than the one already held.
    fn set_snapshot(&self, node: &NodeId, snapshot: Snapshot) -> FlowcResult<Arc<Snapshot>>;

    /// Drop the snapshot for `node`. Returns whether one was held.
    fn clear_snapshot(&self, node: &NodeId) -> bool;

    /// Number of nodes with a snapshot.
    fn snapshot_count(&self) -> usize;
}

/// Sharded snapshot cache backed by `DashMap`.
///
/// ## Important
///
/// No `DashMap` reference is held while watches are notified.
#[derive(Debug)]
pub struct ShardedCache {
    snapshots: DashMap<NodeId, Arc<Snapshot>, FnvBuildHasher>,
    watches: WatchManager,
    stats: CacheStats,
}

impl Default for ShardedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardedCache {
    /// Create a cache with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a cache sized for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: DashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
            watches: WatchManager::new(),
            stats: CacheStats::new(),
        }
    }

    /// Watch manager.
    #[inline]
    pub fn watches(&self) -> &WatchManager {
        &self.watches
    }

    /// Cache statistics.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Subscribe to snapshots of `node`.
    ///
    /// The current snapshot, if any, is delivered by the first
    /// [`SnapshotWatch::changed`] call.
    pub fn watch(&self, node: &NodeId) -> SnapshotWatch {
        self.stats.record_watch();
        // Subscribe before reading so a concurrent set is never missed.
        let watch = self.watches.subscribe(node);
        let current = self.snapshots.get(node).map(|r| Arc::clone(&*r));
        if let Some(snapshot) = current {
            self.watches.notify(node, snapshot);
        }
        watch
    }

    /// Drop the snapshot for `node` and close its watches.
    pub fn remove_node(&self, node: &NodeId) -> bool {
        let had = self.clear_snapshot(node);
        self.watches.close(node);
        self.report_size();
        had
    }

    /// Nodes with a snapshot, sorted.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.snapshots.iter().map(|r| r.key().clone()).collect();
        nodes.sort();
        nodes
    }

    /// Whether a snapshot exists for `node`.
    pub fn has_snapshot(&self, node: &NodeId) -> bool {
        self.snapshots.contains_key(node)
    }

    /// Iterate over all snapshots.
    ///
    /// Acquires read locks shard by shard.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Arc<Snapshot>)> + '_ {
        self.snapshots
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
    }

    fn report_size(&self) {
        metrics::gauge!("flowc_cache_nodes").set(self.snapshots.len() as f64);
    }
}

impl Cache for ShardedCache {
    fn get_snapshot(&self, node: &NodeId) -> Option<Arc<Snapshot>> {
        let result = self.snapshots.get(node).map(|r| Arc::clone(&*r));

        if result.is_some() {
            self.stats.record_hit();
            trace!(node = %node, "cache hit");
        } else {
            self.stats.record_miss();
            trace!(node = %node, "cache miss");
        }

        result
    }

    fn set_snapshot(&self, node: &NodeId, snapshot: Snapshot) -> FlowcResult<Arc<Snapshot>> {
        let snapshot = Arc::new(snapshot);

        match self.snapshots.entry(node.clone()) {
            Entry::Occupied(mut held) => {
                let current = held.get().version();
                if snapshot.version() <= current {
                    self.stats.record_rejection();
                    warn!(
                        node = %node,
                        current = %current,
                        proposed = %snapshot.version(),
                        "rejected snapshot version regression"
                    );
                    return Err(FlowcError::cache(format!(
                        "snapshot version {} for node {node} is not newer than {current}",
                        snapshot.version()
                    )));
                }
                held.insert(Arc::clone(&snapshot));
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&snapshot));
            }
        }
        self.stats.record_set();
        self.report_size();

        debug!(
            node = %node,
            version = %snapshot.version(),
            resources = snapshot.total_resources(),
            "set snapshot"
        );

        if self.watches.notify(node, Arc::clone(&snapshot)) {
            self.stats.record_notification();
        }
        Ok(snapshot)
    }

    fn clear_snapshot(&self, node: &NodeId) -> bool {
        let removed = self.snapshots.remove(node).is_some();
        if removed {
            self.stats.record_clear();
            self.report_size();
            debug!(node = %node, "cleared snapshot");
        }
        removed
    }

    fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}

/// Builder for a configured cache.
#[derive(Debug, Default)]
pub struct CacheBuilder {
    capacity: Option<usize>,
}

impl CacheBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial node capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Build the cache.
    pub fn build(self) -> ShardedCache {
        ShardedCache::with_capacity(self.capacity.unwrap_or(64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowc_core::SnapshotVersion;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn snapshot(v: u64) -> Snapshot {
        Snapshot::builder().version(SnapshotVersion::from_u64(v)).build()
    }

    #[test]
    fn cache_basic_operations() {
        let cache = ShardedCache::new();
        let node = NodeId::new("edge-1");

        assert!(cache.get_snapshot(&node).is_none());
        assert_eq!(cache.snapshot_count(), 0);

        cache.set_snapshot(&node, snapshot(1)).unwrap();
        assert!(cache.has_snapshot(&node));
        assert_eq!(cache.snapshot_count(), 1);
        assert_eq!(cache.get_snapshot(&node).unwrap().version().as_u64(), 1);

        assert!(cache.clear_snapshot(&node));
        assert!(!cache.has_snapshot(&node));
        assert!(!cache.clear_snapshot(&node));
    }

    #[test]
    fn rejects_version_regression() {
        let cache = ShardedCache::new();
        let node = NodeId::new("edge-1");

        cache.set_snapshot(&node, snapshot(2)).unwrap();
        assert!(cache.set_snapshot(&node, snapshot(2)).is_err());
        assert!(cache.set_snapshot(&node, snapshot(1)).is_err());
        assert_eq!(cache.get_snapshot(&node).unwrap().version().as_u64(), 2);
        assert_eq!(cache.stats().snapshots_rejected(), 2);

        cache.set_snapshot(&node, snapshot(3)).unwrap();
        assert_eq!(cache.get_snapshot(&node).unwrap().version().as_u64(), 3);
    }

    #[test]
    fn cache_stats_tracking() {
        let cache = ShardedCache::new();
        let node = NodeId::new("edge-1");

        cache.get_snapshot(&node);
        assert_eq!(cache.stats().snapshot_misses(), 1);

        cache.set_snapshot(&node, snapshot(1)).unwrap();
        assert_eq!(cache.stats().snapshots_set(), 1);

        cache.get_snapshot(&node);
        assert_eq!(cache.stats().snapshot_hits(), 1);
    }

    #[tokio::test]
    async fn cache_watch_notification() {
        let cache = ShardedCache::new();
        let node = NodeId::new("edge-1");

        let mut watch = cache.watch(&node);
        cache.set_snapshot(&node, snapshot(1)).unwrap();

        let received = watch.changed().await.unwrap();
        assert_eq!(received.version().as_u64(), 1);
        assert_eq!(cache.stats().notifications_sent(), 1);
    }

    #[tokio::test]
    async fn watch_sees_existing_snapshot() {
        let cache = ShardedCache::new();
        let node = NodeId::new("edge-1");
        cache.set_snapshot(&node, snapshot(4)).unwrap();

        let mut watch = cache.watch(&node);
        assert_eq!(watch.changed().await.unwrap().version().as_u64(), 4);
    }

    #[tokio::test]
    async fn remove_node_closes_watches() {
        let cache = ShardedCache::new();
        let node = NodeId::new("edge-1");
        cache.set_snapshot(&node, snapshot(1)).unwrap();
        let mut watch = cache.watch(&node);
        watch.latest();

        assert!(cache.remove_node(&node));
        assert!(watch.changed().await.is_none());
        assert!(cache.nodes().is_empty());
    }

    #[test]
    fn nodes_are_sorted() {
        let cache = CacheBuilder::new().capacity(8).build();
        for name in ["c", "a", "b"] {
            cache.set_snapshot(&NodeId::new(name), snapshot(1)).unwrap();
        }
        let nodes: Vec<String> = cache.nodes().iter().map(|n| n.to_string()).collect();
        assert_eq!(nodes, vec!["a", "b", "c"]);
        assert_eq!(cache.iter().count(), 3);
    }

    #[test]
    fn cache_concurrent_reads() {
        let cache = Arc::new(ShardedCache::new());
        let node = NodeId::new("edge-1");
        cache.set_snapshot(&node, snapshot(1)).unwrap();

        let read_count = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let cache = Arc::clone(&cache);
            let count = Arc::clone(&read_count);
            let node = node.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    if cache.get_snapshot(&node).is_some() {
                        count.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(read_count.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn cache_concurrent_writes() {
        let cache = Arc::new(ShardedCache::new());
        let mut handles = vec![];

        for i in 0..10 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let node = NodeId::new(format!("node-{i}-{j}"));
                    cache.set_snapshot(&node, snapshot(1)).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(cache.snapshot_count(), 1000);
    }

    #[test]
    fn concurrent_writers_never_regress() {
        let cache = Arc::new(ShardedCache::new());
        let node = NodeId::new("contended");
        let accepted = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for t in 0..4u64 {
            let cache = Arc::clone(&cache);
            let node = node.clone();
            let accepted = Arc::clone(&accepted);
            handles.push(thread::spawn(move || {
                for i in 0..50u64 {
                    if cache.set_snapshot(&node, snapshot(i * 4 + t + 1)).is_ok() {
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                    thread::sleep(Duration::from_micros(20));
                }
            }));
        }

        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(cache.get_snapshot(&node).unwrap().version().as_u64(), 200);
        assert!(accepted.load(Ordering::Relaxed) >= 1);
    }
}

//! Per-node snapshot watches.
//!
//! Each node with at least one subscriber owns a `tokio::sync::watch`
//! channel holding its latest snapshot. The channel only ever moves to a
//! higher version, so a subscriber that wakes late sees the newest snapshot
//! and never an older one. Dropping a node's sender closes every watch on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use fnv::FnvBuildHasher;
use flowc_core::NodeId;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::Snapshot;

type Slot = Option<Arc<Snapshot>>;

/// Unique identifier for a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Subscription to one node's snapshots.
#[derive(Debug)]
pub struct SnapshotWatch {
    id: WatchId,
    node: NodeId,
    receiver: watch::Receiver<Slot>,
}

impl SnapshotWatch {
    /// Watch identifier.
    #[inline]
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Node being watched.
    #[inline]
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Latest snapshot, marking it as seen.
    pub fn latest(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait for a snapshot newer than the last one seen.
    ///
    /// Returns `None` once the node is removed from the cache.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(snapshot) = self.receiver.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }
}

/// Owner of the per-node watch channels.
#[derive(Debug, Default)]
pub struct WatchManager {
    senders: DashMap<NodeId, watch::Sender<Slot>, FnvBuildHasher>,
}

impl WatchManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `node`, creating its channel on first use.
    ///
    /// If the channel already holds a snapshot, the first
    /// [`SnapshotWatch::changed`] call returns it.
    pub fn subscribe(&self, node: &NodeId) -> SnapshotWatch {
        let sender = self
            .senders
            .entry(node.clone())
            .or_insert_with(|| watch::channel(None).0);
        let mut receiver = sender.subscribe();
        drop(sender);
        // A fresh receiver has already seen the current value.
        if receiver.borrow().is_some() {
            receiver.mark_changed();
        }

        let id = WatchId::next();
        debug!(watch_id = %id, node = %node, "created watch");
        SnapshotWatch {
            id,
            node: node.clone(),
            receiver,
        }
    }

    /// Publish `snapshot` to watchers of `node`.
    ///
    /// Returns `true` when the channel moved forward. Nodes without
    /// subscribers are skipped.
    pub fn notify(&self, node: &NodeId, snapshot: Arc<Snapshot>) -> bool {
        let Some(sender) = self.senders.get(node) else {
            return false;
        };
        let version = snapshot.version();
        let advanced = advance(&sender, snapshot);
        trace!(node = %node, version = %version, advanced, "notified watches");
        advanced
    }

    /// Close every watch on `node`.
    pub fn close(&self, node: &NodeId) {
        if self.senders.remove(node).is_some() {
            debug!(node = %node, "closed watches");
        }
    }

    /// Number of live subscribers for `node`.
    pub fn watch_count(&self, node: &NodeId) -> usize {
        self.senders
            .get(node)
            .map_or(0, |s| s.receiver_count())
    }

    /// Live subscribers across all nodes.
    pub fn total_watch_count(&self) -> usize {
        self.senders.iter().map(|s| s.receiver_count()).sum()
    }
}

fn advance(sender: &watch::Sender<Slot>, snapshot: Arc<Snapshot>) -> bool {
    sender.send_if_modified(|slot| match slot {
        Some(held) if held.version() >= snapshot.version() => false,
        _ => {
            *slot = Some(snapshot);
            true
        }
    })
}

//! Cache and watch behavior as seen through the control plane.

use std::sync::Arc;
use std::time::Duration;

use flowc::prelude::*;
use tokio::time::timeout;

use crate::{api, deployment, NODE};

#[test]
fn cache_multiple_nodes() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));

    let nodes = ["node-1", "node-2", "node-3"];
    for (i, id) in nodes.iter().enumerate() {
        cp.initialize_node(&NodeId::new(id), 10000 + i as u16).unwrap();
    }

    assert_eq!(cache.snapshot_count(), 3);
    assert_eq!(
        cp.list_nodes(),
        nodes.iter().map(|id| NodeId::new(id)).collect::<Vec<_>>()
    );
    for id in nodes {
        let snapshot = cache.get_snapshot(&NodeId::new(id)).unwrap();
        assert_eq!(snapshot.version(), SnapshotVersion::initial());
    }
}

#[test]
fn cache_stats_tracking() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    let node = NodeId::new(NODE);

    assert!(cache.get_snapshot(&node).is_none());
    cp.initialize_node(&node, 10000).unwrap();
    cp.deploy(&deployment("a", "v1", None), &api("a", "v1", "/a", &[("a", "GET", "/")]))
        .unwrap();
    assert!(cache.get_snapshot(&node).is_some());

    let stats = cache.stats();
    assert_eq!(stats.snapshots_set(), 2);
    assert_eq!(stats.snapshots_rejected(), 0);
    assert!(stats.snapshot_misses() >= 1);
    assert!(stats.snapshot_hits() >= 1);
}

#[test]
fn rejected_deploy_is_counted() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    let node = NodeId::new(NODE);
    cp.initialize_node(&node, 10000).unwrap();
    cp.deploy(&deployment("a", "v1", None), &api("a", "v1", "/", &[("a", "GET", "/a")]))
        .unwrap();

    let mut overlapping = deployment("b", "v1", None);
    overlapping.flowc_metadata.gateway.domains = vec!["*".into(), "b.example.com".into()];
    assert!(cp
        .deploy(&overlapping, &api("b", "v1", "/", &[("b", "GET", "/b")]))
        .is_err());
    assert_eq!(cache.stats().snapshots_rejected(), 1);
}

#[tokio::test]
async fn watch_follows_deployments() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    let node = NodeId::new(NODE);

    let mut watch = cache.watch(&node);
    assert_eq!(cache.watches().watch_count(&node), 1);

    let v1 = cp.initialize_node(&node, 10000).unwrap();
    let seen = timeout(Duration::from_secs(1), watch.changed()).await.unwrap().unwrap();
    assert_eq!(seen.version(), v1);

    let v2 = cp
        .deploy(&deployment("a", "v1", None), &api("a", "v1", "/a", &[("a", "GET", "/")]))
        .unwrap();
    let seen = timeout(Duration::from_secs(1), watch.changed()).await.unwrap().unwrap();
    assert_eq!(seen.version(), v2);
    assert!(seen.contains(ResourceType::Cluster, "a-v1-cluster"));
}

#[tokio::test]
async fn late_watch_gets_current_snapshot() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    let node = NodeId::new(NODE);
    let version = cp.initialize_node(&node, 10000).unwrap();

    let mut watch = cache.watch(&node);
    let seen = timeout(Duration::from_secs(1), watch.changed()).await.unwrap().unwrap();
    assert_eq!(seen.version(), version);
}

#[tokio::test]
async fn remove_node_ends_watches() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    let node = NodeId::new(NODE);
    cp.initialize_node(&node, 10000).unwrap();

    let mut watch = cache.watch(&node);
    assert!(watch.latest().is_some());

    cp.remove_node(&node).unwrap();
    let closed = timeout(Duration::from_secs(1), watch.changed()).await.unwrap();
    assert!(closed.is_none());
    assert!(matches!(cp.remove_node(&node), Err(FlowcError::NodeNotFound { .. })));
}

#[test]
fn reinitialized_node_never_regresses() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    let node = NodeId::new(NODE);

    cp.initialize_node(&node, 10000).unwrap();
    let deployed = cp
        .deploy(&deployment("a", "v1", None), &api("a", "v1", "/a", &[("a", "GET", "/")]))
        .unwrap();
    cp.remove_node(&node).unwrap();

    let again = cp.initialize_node(&node, 10000).unwrap();
    assert!(again > deployed);
}

//! Load tests with 1000 nodes.
//!
//! Run with: `cargo test --package flowc-integration-tests load_tests -- --nocapture`

use std::sync::Arc;
use std::time::Instant;

use flowc::prelude::*;
use tokio::sync::Barrier;

use crate::{api, deployment};

const NODES: usize = 1000;

fn node(i: usize) -> NodeId {
    NodeId::new(format!("envoy-sidecar-{i}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deploy_to_1000_nodes() {
    let cache = Arc::new(ShardedCache::new());
    let cp = Arc::new(ControlPlane::new(Arc::clone(&cache)));
    let barrier = Arc::new(Barrier::new(NODES));

    let start = Instant::now();
    let handles: Vec<_> = (0..NODES)
        .map(|i| {
            let cp = Arc::clone(&cp);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                let id = node(i);
                cp.initialize_node(&id, 10000).unwrap();
                let mut d = deployment("orders", "v1", None);
                d.flowc_metadata.gateway.node_id = id.as_str().to_string();
                d.node_id = id.as_str().to_string();
                cp.deploy(&d, &api("orders", "v1", "/orders", &[("list", "GET", "/")]))
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let version = handle.await.unwrap();
        assert_eq!(version, SnapshotVersion::initial().next());
    }
    println!("deployed to {NODES} nodes in {:?}", start.elapsed());

    assert_eq!(cache.snapshot_count(), NODES);
    assert_eq!(cp.list_nodes().len(), NODES);
    assert_eq!(cache.stats().snapshots_set(), 2 * NODES as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn watches_under_load() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));

    let mut watches: Vec<_> = (0..NODES).map(|i| cache.watch(&node(i))).collect();
    assert_eq!(cache.watches().total_watch_count(), NODES);

    let start = Instant::now();
    for i in 0..NODES {
        cp.initialize_node(&node(i), 10000).unwrap();
    }
    for watch in &mut watches {
        let snapshot = watch.changed().await.unwrap();
        assert_eq!(snapshot.version(), SnapshotVersion::initial());
    }
    println!("notified {NODES} watches in {:?}", start.elapsed());
}

#[test]
fn read_heavy_workload() {
    let cache = Arc::new(ShardedCache::new());
    let cp = ControlPlane::new(Arc::clone(&cache));
    for i in 0..NODES {
        cp.initialize_node(&node(i), 10000).unwrap();
    }
    cache.stats().reset();

    let start = Instant::now();
    let threads: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..NODES {
                    assert!(cache.get_snapshot(&node((i + t * 250) % NODES)).is_some());
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    println!("{} reads in {:?}", 4 * NODES, start.elapsed());

    assert_eq!(cache.stats().snapshot_hits(), 4 * NODES as u64);
    assert_eq!(cache.stats().hit_rate(), 1.0);
}

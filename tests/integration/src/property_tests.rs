//! Properties that hold for every built-in strategy combination and every
//! sequence of node operations.

use std::sync::Arc;
use std::thread;

use flowc::cache::consistency;
use flowc::model::strategy::{
    BlueGreenConfig, CanaryConfig, DeploymentStrategyConfig, LoadBalancingConfig, RetryConfig, RouteMatchingConfig,
};
use flowc::prelude::*;
use proptest::prelude::*;

use crate::{api, deployment, NODE};

fn deployment_config(kind: &str, weight: u32) -> DeploymentStrategyConfig {
    match kind {
        "canary" => DeploymentStrategyConfig {
            strategy_type: kind.into(),
            canary: Some(CanaryConfig {
                baseline_version: "v1".into(),
                canary_version: "v2".into(),
                canary_weight: weight,
            }),
            ..Default::default()
        },
        "blue-green" => DeploymentStrategyConfig {
            strategy_type: kind.into(),
            blue_green: Some(BlueGreenConfig {
                active_version: "v1".into(),
                standby_version: "v2".into(),
                auto_promote: false,
            }),
            ..Default::default()
        },
        _ => DeploymentStrategyConfig {
            strategy_type: kind.into(),
            ..Default::default()
        },
    }
}

fn retry_config(kind: &str) -> RetryConfig {
    RetryConfig {
        strategy_type: kind.into(),
        max_retries: (kind == "custom").then_some(2),
        ..Default::default()
    }
}

fn combination(dep: &str, weight: u32, route: &str, lb: &str, retry: &str) -> StrategyConfig {
    StrategyConfig {
        deployment: Some(deployment_config(dep, weight)),
        route_matching: Some(RouteMatchingConfig {
            strategy_type: route.into(),
            ..Default::default()
        }),
        load_balancing: Some(LoadBalancingConfig {
            strategy_type: lb.into(),
            ..Default::default()
        }),
        retry: Some(retry_config(retry)),
        ..Default::default()
    }
}

fn sample_api() -> Api {
    api(
        "svc",
        "v1",
        "/svc",
        &[
            ("list", "GET", "/items"),
            ("get", "GET", "/items/{id}"),
            ("create", "POST", "/items"),
        ],
    )
}

proptest! {
    #[test]
    fn every_combination_translates_consistently(
        dep in prop::sample::select(vec!["basic", "canary", "blue-green"]),
        weight in 0u32..=100,
        route in prop::sample::select(vec!["prefix", "exact", "regex", "header-versioned"]),
        lb in prop::sample::select(vec!["round-robin", "least-request", "random", "consistent-hash", "locality-aware"]),
        retry in prop::sample::select(vec!["none", "conservative", "aggressive", "custom"]),
    ) {
        let cp = ControlPlane::new(Arc::new(ShardedCache::new()));
        let node = NodeId::new(NODE);
        let d = deployment("svc", "v1", Some(combination(dep, weight, route, lb, retry)));

        let resources = cp.translate(&d, &sample_api()).unwrap();
        prop_assert!(!resources.clusters.is_empty());
        prop_assert!(consistency::check(&node, &resources).is_ok());

        cp.initialize_node(&node, 10000).unwrap();
        cp.deploy(&d, &sample_api()).unwrap();
        let snapshot = cp.snapshot(&node).unwrap();
        prop_assert!(consistency::check_snapshot(&node, &snapshot).is_ok());
    }

    #[test]
    fn versions_only_increase(ops in prop::collection::vec(0u8..5, 1..30)) {
        let cp = ControlPlane::new(Arc::new(ShardedCache::new()));
        let node = NodeId::new(NODE);
        let mut last: Option<SnapshotVersion> = None;

        for (i, op) in ops.into_iter().enumerate() {
            let name = format!("api{}", i % 3);
            let published = match op {
                0 => cp.initialize_node(&node, 10000 + (i % 2) as u16).ok(),
                1 | 2 => cp
                    .deploy(
                        &deployment(&name, "v1", None),
                        &api(&name, "v1", &format!("/{name}"), &[("get", "GET", "/")]),
                    )
                    .ok(),
                3 => cp.undeploy(&node, &format!("{name}-v1")).ok().flatten(),
                _ => {
                    let _ = cp.remove_node(&node);
                    None
                }
            };
            if let Some(version) = published {
                if let Some(previous) = last {
                    prop_assert!(version >= previous);
                }
                last = Some(version);
            }
            if let (Some(snapshot), Some(previous)) = (cp.snapshot(&node), last) {
                prop_assert!(snapshot.version() <= previous);
            }
        }
    }
}

#[test]
fn translation_is_pure_across_threads() {
    let cp = Arc::new(ControlPlane::new(Arc::new(ShardedCache::new())));
    let d = deployment(
        "svc",
        "v1",
        Some(combination("canary", 25, "regex", "consistent-hash", "aggressive")),
    );
    let reference = Snapshot::from_resources(SnapshotVersion::initial(), &cp.translate(&d, &sample_api()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cp = Arc::clone(&cp);
            let d = d.clone();
            thread::spawn(move || cp.translate(&d, &sample_api()).unwrap())
        })
        .collect();

    for handle in handles {
        let resources = handle.join().unwrap();
        let snapshot = Snapshot::from_resources(SnapshotVersion::initial(), &resources);
        assert!(snapshot.same_resources(&reference));
    }
}

//! Deployment scenarios run through the full control plane.

use std::sync::Arc;
use std::time::Duration;

use flowc::cache::consistency;
use flowc::prelude::*;
use flowc::translator::builders::RouteTarget;
use flowc::translator::{SHARED_LISTENER_NAME, SHARED_ROUTE_NAME};
use flowc::types::pb::envoy::config::cluster::v3::{cluster, Cluster};
use flowc::types::pb::envoy::config::route::v3::{route, route_match, Route, RouteAction, RouteConfiguration};

use crate::{api, deployment, strategy, NODE};

fn setup() -> (ControlPlane, NodeId) {
    let control_plane = ControlPlane::new(Arc::new(ShardedCache::new()));
    let node = NodeId::new(NODE);
    control_plane
        .initialize_node(&node, 10000)
        .expect("node initializes");
    (control_plane, node)
}

fn shared_routes(snapshot: &Snapshot) -> Vec<Route> {
    snapshot
        .typed::<RouteConfiguration>(ResourceType::Route)
        .filter(|rc| rc.name == SHARED_ROUTE_NAME)
        .flat_map(|rc| rc.virtual_hosts.iter())
        .flat_map(|vh| vh.routes.iter().cloned())
        .collect()
}

fn cluster<'a>(snapshot: &'a Snapshot, name: &str) -> &'a Cluster {
    snapshot
        .typed::<Cluster>(ResourceType::Cluster)
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("cluster {name} missing"))
}

fn action(route: &Route) -> &RouteAction {
    match &route.action {
        Some(route::Action::Route(action)) => action,
        other => panic!("expected route action, got {other:?}"),
    }
}

fn method_of(route: &Route) -> bool {
    route
        .r#match
        .as_ref()
        .is_some_and(|m| m.headers.iter().any(|h| h.name == ":method"))
}

#[test]
fn basic_rest_deploy() {
    let (cp, node) = setup();
    let before = cp.snapshot(&node).unwrap();

    let d = deployment(
        "users-api",
        "v1.0.0",
        Some(strategy(
            r#"
deployment: { type: basic }
route_matching: { type: prefix }
load_balancing: { type: round-robin }
retry: { type: conservative }
"#,
        )),
    );
    let ir = api("users-api", "v1.0.0", "/api/v1", &[("getUser", "GET", "/users/{id}")]);
    cp.deploy(&d, &ir).unwrap();

    let snapshot = cp.snapshot(&node).unwrap();
    let c = cluster(&snapshot, "users-api-v1.0.0-cluster");
    assert_eq!(
        c.cluster_discovery_type,
        Some(cluster::ClusterDiscoveryType::Type(cluster::DiscoveryType::LogicalDns as i32))
    );
    assert_eq!(snapshot.get_resources(ResourceType::Cluster).map(|r| r.len()), Some(1));

    let routes = shared_routes(&snapshot);
    assert_eq!(routes.len(), 1);
    assert_eq!(
        routes[0].r#match.as_ref().and_then(|m| m.path_specifier.clone()),
        Some(route_match::PathSpecifier::Prefix("/api/v1/users/{id}".into()))
    );
    assert!(method_of(&routes[0]));

    let retry = action(&routes[0]).retry_policy.as_ref().expect("retry policy");
    assert_eq!(retry.num_retries.as_ref().map(|v| v.value), Some(1));
    assert_eq!(retry.retry_on, "5xx,reset");
    assert_eq!(retry.per_try_timeout.as_ref().map(|d| d.seconds), Some(5));

    assert!(snapshot.contains(ResourceType::Listener, SHARED_LISTENER_NAME));
    assert_eq!(
        snapshot.encoded(ResourceType::Listener, &[]),
        before.encoded(ResourceType::Listener, &[])
    );
}

#[test]
fn canary_ten_percent() {
    let (cp, node) = setup();
    let d = deployment(
        "payment-api",
        "v2.0.0",
        Some(strategy(
            r#"
deployment:
  type: canary
  canary: { baseline_version: v1.0.0, canary_version: v2.0.0, canary_weight: 10 }
route_matching: { type: exact }
load_balancing: { type: consistent-hash, hash_on: header, header_name: x-session-id }
retry: { type: none }
"#,
        )),
    );
    let ir = api(
        "payment-api",
        "v2.0.0",
        "/",
        &[("process", "POST", "/process"), ("refund", "POST", "/refund")],
    );
    cp.deploy(&d, &ir).unwrap();
    let snapshot = cp.snapshot(&node).unwrap();

    for name in ["payment-api-v1.0.0-cluster", "payment-api-v2.0.0-cluster"] {
        let c = cluster(&snapshot, name);
        assert_eq!(c.lb_policy, cluster::LbPolicy::RingHash as i32);
        match &c.lb_config {
            Some(cluster::LbConfig::RingHashLbConfig(cfg)) => {
                assert!(cfg.minimum_ring_size.as_ref().map_or(0, |v| v.value) >= 1024);
                assert_eq!(
                    cfg.hash_function,
                    cluster::ring_hash_lb_config::HashFunction::XxHash as i32
                );
            }
            other => panic!("expected ring hash config, got {other:?}"),
        }
    }

    let routes = shared_routes(&snapshot);
    assert_eq!(routes.len(), 2);
    let paths: Vec<_> = routes
        .iter()
        .map(|r| r.r#match.as_ref().and_then(|m| m.path_specifier.clone()))
        .collect();
    assert_eq!(
        paths,
        vec![
            Some(route_match::PathSpecifier::Path("/process".into())),
            Some(route_match::PathSpecifier::Path("/refund".into())),
        ]
    );
    for route in &routes {
        assert!(method_of(route));
        assert_eq!(
            RouteTarget::of(route),
            Some(RouteTarget::Weighted(vec![
                ("payment-api-v1.0.0-cluster".into(), 90),
                ("payment-api-v2.0.0-cluster".into(), 10),
            ]))
        );
        assert!(action(route).retry_policy.is_none());
        assert!(!action(route).hash_policy.is_empty());
    }
}

#[test]
fn blue_green() {
    let (cp, node) = setup();
    let d = deployment(
        "order-api",
        "v1.0.0",
        Some(strategy(
            r#"
deployment:
  type: blue-green
  blue_green: { active_version: v1.0.0, standby_version: v2.0.0 }
route_matching: { type: prefix }
load_balancing: { type: least-request, choice_count: 2 }
retry: { type: conservative }
"#,
        )),
    );
    let ir = api(
        "order-api",
        "v1.0.0",
        "/orders",
        &[("list", "GET", "/"), ("create", "POST", "/")],
    );
    cp.deploy(&d, &ir).unwrap();
    let snapshot = cp.snapshot(&node).unwrap();

    let active = cluster(&snapshot, "order-api-v1.0.0-active-cluster");
    assert_eq!(active.lb_policy, cluster::LbPolicy::LeastRequest as i32);
    cluster(&snapshot, "order-api-v2.0.0-standby-cluster");

    let routes = shared_routes(&snapshot);
    assert_eq!(routes.len(), 2);
    for route in &routes {
        assert_eq!(
            RouteTarget::of(route),
            Some(RouteTarget::Cluster("order-api-v1.0.0-active-cluster".into()))
        );
        assert!(action(route).retry_policy.is_some());
    }
}

#[test]
fn merge_preserves_other_apis() {
    let (cp, node) = setup();
    let listeners = cp.snapshot(&node).unwrap().encoded(ResourceType::Listener, &[]);

    cp.deploy(&deployment("a", "v1", None), &api("a", "v1", "/", &[("a", "GET", "/a")]))
        .unwrap();
    cp.deploy(&deployment("b", "v1", None), &api("b", "v1", "/", &[("b", "GET", "/b")]))
        .unwrap();

    let snapshot = cp.snapshot(&node).unwrap();
    assert!(snapshot.contains(ResourceType::Cluster, "a-v1-cluster"));
    assert!(snapshot.contains(ResourceType::Cluster, "b-v1-cluster"));
    assert_eq!(snapshot.get_resources(ResourceType::Route).map(|r| r.len()), Some(1));

    let paths: Vec<_> = shared_routes(&snapshot)
        .iter()
        .map(|r| r.r#match.as_ref().and_then(|m| m.path_specifier.clone()))
        .collect();
    assert_eq!(
        paths,
        vec![
            Some(route_match::PathSpecifier::Prefix("/a".into())),
            Some(route_match::PathSpecifier::Prefix("/b".into())),
        ]
    );
    assert_eq!(snapshot.encoded(ResourceType::Listener, &[]), listeners);
    consistency::check_snapshot(&node, &snapshot).unwrap();
}

#[test]
fn invalid_canary_rejected() {
    let (cp, node) = setup();
    cp.deploy(&deployment("a", "v1", None), &api("a", "v1", "/", &[("a", "GET", "/a")]))
        .unwrap();
    let before = cp.snapshot(&node).unwrap();

    let d = deployment(
        "payment-api",
        "v2.0.0",
        Some(strategy(
            r#"
deployment:
  type: canary
  canary: { baseline_version: v1.0.0, canary_version: v2.0.0, canary_weight: 150 }
"#,
        )),
    );
    let err = cp
        .deploy(&d, &api("payment-api", "v2.0.0", "/", &[("p", "POST", "/process")]))
        .unwrap_err();
    assert!(matches!(err, FlowcError::Validation { .. }), "{err}");

    let after = cp.snapshot(&node).unwrap();
    assert_eq!(after.version(), before.version());
    assert!(after.same_resources(&before));
}

#[test]
fn regex_derivation_in_emitted_route() {
    let (cp, node) = setup();
    let d = deployment("posts-api", "v1", Some(strategy("route_matching: { type: regex }")));
    cp.deploy(
        &d,
        &api("posts-api", "v1", "/", &[("getPost", "GET", "/users/{id}/posts/{postId}")]),
    )
    .unwrap();

    let routes = shared_routes(&cp.snapshot(&node).unwrap());
    let pattern = match routes[0].r#match.as_ref().and_then(|m| m.path_specifier.clone()) {
        Some(route_match::PathSpecifier::SafeRegex(matcher)) => matcher.regex,
        other => panic!("expected regex match, got {other:?}"),
    };
    let re = regex::Regex::new(&pattern).unwrap();
    assert!(re.is_match("/users/42/posts/9"));
    assert!(!re.is_match("/users/42/posts/"));
    assert!(!re.is_match("/users/42/posts/9/comments"));
}

#[test]
fn redeploy_is_idempotent() {
    let (cp, node) = setup();
    let d = deployment("users-api", "v1", None);
    let ir = api("users-api", "v1", "/api", &[("list", "GET", "/users")]);

    let v1 = cp.deploy(&d, &ir).unwrap();
    let first = cp.snapshot(&node).unwrap();
    let v2 = cp.deploy(&d, &ir).unwrap();
    let second = cp.snapshot(&node).unwrap();

    assert!(v2 > v1);
    assert!(first.same_resources(&second));
    assert_eq!(cp.list_deployments(&node).unwrap().len(), 1);
}

#[test]
fn failed_deploy_is_atomic() {
    let (cp, node) = setup();
    cp.deploy(&deployment("a", "v1", None), &api("a", "v1", "/", &[("a", "GET", "/a")]))
        .unwrap();
    let before = cp.snapshot(&node).unwrap();

    // Shares one domain with the existing virtual host but not the other.
    let mut overlapping = deployment("b", "v1", None);
    overlapping.flowc_metadata.gateway.domains = vec!["*".into(), "api.example.com".into()];
    let clash = cp.deploy(&overlapping, &api("b", "v1", "/", &[("b", "GET", "/b")]));
    assert!(matches!(clash, Err(FlowcError::Consistency { .. })), "{clash:?}");

    let after = cp.snapshot(&node).unwrap();
    assert_eq!(after.version(), before.version());
    assert!(after.same_resources(&before));
    assert_eq!(cp.list_deployments(&node).unwrap().len(), 1);
}

#[test]
fn same_api_version_under_new_id_is_rejected() {
    let (cp, node) = setup();
    let ir = api("a", "v1", "/", &[("a", "GET", "/a")]);
    cp.deploy(&deployment("a", "v1", None), &ir).unwrap();

    let mut other = deployment("a", "v1", None);
    other.id = "another-id".into();
    let err = cp.deploy(&other, &ir).unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(cp.list_deployments(&node).unwrap().len(), 1);
}

#[test]
fn undeploy_restores_base() {
    let (cp, node) = setup();
    let base = cp.snapshot(&node).unwrap();

    cp.deploy(&deployment("a", "v1", None), &api("a", "v1", "/", &[("a", "GET", "/a")]))
        .unwrap();
    let version = cp.undeploy(&node, "a-v1").unwrap().expect("node keeps its base");

    let snapshot = cp.snapshot(&node).unwrap();
    assert_eq!(snapshot.version(), version);
    assert!(snapshot.same_resources(&base));
    assert!(matches!(
        cp.undeploy(&node, "a-v1"),
        Err(FlowcError::DeploymentNotFound { .. })
    ));
}

#[test]
fn streaming_endpoint_has_no_route_timeout() {
    let (cp, node) = setup();
    let ir = api("events", "v1", "/", &[]).with_endpoint(
        Endpoint::new("stream", "GET", "/events").with_type(EndpointType::Sse),
    );
    cp.deploy(&deployment("events", "v1", None), &ir).unwrap();

    let routes = shared_routes(&cp.snapshot(&node).unwrap());
    let timeout = action(&routes[0]).timeout.clone().expect("timeout set");
    assert_eq!(Duration::new(timeout.seconds as u64, timeout.nanos as u32), Duration::ZERO);
}

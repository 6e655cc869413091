//! Simple flowc control plane.
//!
//! Initializes one node, deploys a demo API to it and serves ADS until
//! SIGTERM or Ctrl+C. Point an Envoy with `node.id` matching `FLOWC_NODE`
//! (default `edge-1`) and an ADS cluster at the listen address.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p simple-control-plane -- [server.yaml]
//! ```
//!
//! `server.yaml` holds a `ServerConfig`, for example:
//! ```yaml
//! listen_addr: 127.0.0.1:18000
//! keepalive_interval: 20s
//! shutdown_grace_period: 5s
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use flowc::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LISTENER_PORT: u16 = 10000;

fn load_config() -> anyhow::Result<ServerConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            let config: ServerConfig = serde_yaml::from_str(&raw).with_context(|| format!("parsing {path}"))?;
            Ok(config)
        }
        None => Ok(ServerConfig::default()),
    }
}

fn demo_api() -> (ApiDeployment, Api) {
    let node_id = std::env::var("FLOWC_NODE").unwrap_or_else(|_| "edge-1".to_string());
    let deployment = ApiDeployment::new(FlowcMetadata {
        name: "users-api".into(),
        version: "v1.0.0".into(),
        upstream: UpstreamConfig {
            host: "httpbin.org".into(),
            port: 80,
            timeout: Some(Duration::from_secs(15)),
            ..Default::default()
        },
        gateway: GatewayTarget {
            node_id,
            port: LISTENER_PORT,
            ..Default::default()
        },
        ..Default::default()
    });
    let api = Api::new(ApiType::Rest, "users-api", "v1.0.0")
        .with_base_path("/api/v1")
        .with_endpoint(Endpoint::new("listUsers", "GET", "/users"))
        .with_endpoint(Endpoint::new("getUser", "GET", "/users/{id}"))
        .with_endpoint(Endpoint::new("events", "GET", "/events").with_type(EndpointType::Sse));
    (deployment, api)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("{}", flowc::version::version_string());
    let config = load_config()?;

    let cache = Arc::new(ShardedCache::new());
    let control_plane = ControlPlane::new(Arc::clone(&cache));

    let (deployment, api) = demo_api();
    let node = NodeId::new(&deployment.node_id);
    control_plane.initialize_node(&node, LISTENER_PORT)?;
    let version = control_plane.deploy(&deployment, &api)?;
    info!(node = %node, version = %version, deployment = %deployment.id, "demo API deployed");

    let stats_cache = Arc::clone(&cache);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let stats = stats_cache.stats();
            info!(
                nodes = stats_cache.snapshot_count(),
                published = stats.snapshots_set(),
                rejected = stats.snapshots_rejected(),
                watches = stats.watches_created(),
                "cache stats"
            );
        }
    });

    let server = FlowcServer::builder().cache(cache).config(config).build()?;
    info!(addr = %server.config().listen_addr, "press Ctrl+C to shut down");
    server.serve().await?;

    info!("shut down");
    Ok(())
}

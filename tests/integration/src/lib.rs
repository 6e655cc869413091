//! End-to-end tests for the flowc control plane.
//!
//! Fixtures live here; the test modules cover deployment scenarios,
//! snapshot properties, cache behavior under load and a full ADS exchange
//! over a real TCP socket.
//!
//! Run with: `cargo test --package flowc-integration-tests`

use flowc::model::{Api, ApiDeployment, ApiType, Endpoint, FlowcMetadata, GatewayTarget, StrategyConfig, UpstreamConfig};

/// Node every fixture targets.
pub const NODE: &str = "edge-1";

/// Deployment of `name`/`version` to [`NODE`] with id `{name}-{version}`.
pub fn deployment(name: &str, version: &str, strategy: Option<StrategyConfig>) -> ApiDeployment {
    ApiDeployment::with_id(
        format!("{name}-{version}"),
        FlowcMetadata {
            name: name.into(),
            version: version.into(),
            upstream: UpstreamConfig {
                host: "u.local".into(),
                port: 8080,
                ..Default::default()
            },
            gateway: GatewayTarget {
                node_id: NODE.into(),
                ..Default::default()
            },
            strategy,
            ..Default::default()
        },
    )
}

/// REST API under `base_path` with `(id, method, path)` endpoints.
pub fn api(name: &str, version: &str, base_path: &str, endpoints: &[(&str, &str, &str)]) -> Api {
    endpoints.iter().fold(
        Api::new(ApiType::Rest, name, version).with_base_path(base_path),
        |api, (id, method, path)| api.with_endpoint(Endpoint::new(*id, *method, *path)),
    )
}

/// Strategy configuration from YAML.
///
/// # Panics
///
/// On malformed YAML; fixtures are static.
pub fn strategy(yaml: &str) -> StrategyConfig {
    serde_yaml::from_str(yaml).unwrap_or_else(|e| panic!("invalid strategy fixture: {e}\n{yaml}"))
}

#[cfg(test)]
mod ads_tests;
#[cfg(test)]
mod cache_tests;
#[cfg(test)]
mod load_tests;
#[cfg(test)]
mod property_tests;
#[cfg(test)]
mod scenario_tests;

use flowc_types::pb::envoy::config::core::v3::{
    config_source, AggregatedConfigSource, ApiVersion, ConfigSource,
};
use flowc_types::pb::envoy::config::listener::v3::{
    filter, listener_filter, Filter, FilterChain, FilterChainMatch, Listener, ListenerFilter,
};
use flowc_types::pb::envoy::extensions::filters::http::router::v3::Router;
use flowc_types::pb::envoy::extensions::filters::listener::tls_inspector::v3::TlsInspector;
use flowc_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager, http_filter, HttpConnectionManager, HttpFilter, Rds,
};
use flowc_types::{bool_value, pack, type_url};

use super::socket_address;

/// Hostname that yields a catch-all filter chain in SNI listeners.
pub const SNI_WILDCARD: &str = "*";

const WEBSOCKET_UPGRADE: &str = "websocket";

/// Config source pointing at the ADS stream, v3 resources.
pub fn ads_config_source() -> ConfigSource {
    ConfigSource {
        resource_api_version: ApiVersion::V3 as i32,
        config_source_specifier: Some(config_source::ConfigSourceSpecifier::Ads(
            AggregatedConfigSource {},
        )),
        ..Default::default()
    }
}

/// TCP listener on `0.0.0.0:port` with one HTTP connection manager chain
/// fetching `route_config_name` over RDS.
pub fn build_listener(name: &str, route_config_name: &str, port: u16) -> Listener {
    Listener {
        name: name.to_string(),
        address: Some(socket_address("0.0.0.0", port)),
        filter_chains: vec![FilterChain {
            filters: vec![http_connection_manager_filter(name, route_config_name)],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// One SNI-matched filter chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SniFilterChain {
    /// Environment label, used in the chain name and stat prefix.
    pub environment: String,
    /// Server name to match; [`SNI_WILDCARD`] matches anything.
    pub hostname: String,
    /// Route-configuration served on this chain.
    pub route_config_name: String,
}

/// Input of [`build_listener_with_sni`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SniListenerConfig {
    /// Listener name.
    pub name: String,
    /// Bind port.
    pub port: u16,
    /// Chains, one per environment/hostname.
    pub chains: Vec<SniFilterChain>,
}

/// Listener routing by TLS server name, one filter chain per hostname.
///
/// A TLS inspector listener filter extracts SNI. A chain whose hostname is
/// `*` carries no server-name match and catches everything else.
pub fn build_listener_with_sni(cfg: &SniListenerConfig) -> Listener {
    let filter_chains = cfg
        .chains
        .iter()
        .map(|chain| {
            let stat_prefix = format!("{}_{}", cfg.name, chain.environment);
            let filter_chain_match = (chain.hostname != SNI_WILDCARD).then(|| FilterChainMatch {
                server_names: vec![chain.hostname.clone()],
                ..Default::default()
            });
            FilterChain {
                name: format!("{}-{}", chain.environment, chain.hostname),
                filter_chain_match,
                filters: vec![http_connection_manager_filter(
                    &stat_prefix,
                    &chain.route_config_name,
                )],
                ..Default::default()
            }
        })
        .collect();

    Listener {
        name: cfg.name.clone(),
        address: Some(socket_address("0.0.0.0", cfg.port)),
        listener_filters: vec![ListenerFilter {
            name: type_url::names::TLS_INSPECTOR.to_string(),
            config_type: Some(listener_filter::ConfigType::TypedConfig(pack(
                type_url::TLS_INSPECTOR,
                &TlsInspector::default(),
            ))),
            ..Default::default()
        }],
        filter_chains,
        ..Default::default()
    }
}

fn http_connection_manager_filter(stat_prefix: &str, route_config_name: &str) -> Filter {
    let hcm = HttpConnectionManager {
        codec_type: http_connection_manager::CodecType::Auto as i32,
        stat_prefix: stat_prefix.to_string(),
        route_specifier: Some(http_connection_manager::RouteSpecifier::Rds(Rds {
            config_source: Some(ads_config_source()),
            route_config_name: route_config_name.to_string(),
        })),
        http_filters: vec![HttpFilter {
            name: type_url::names::ROUTER.to_string(),
            config_type: Some(http_filter::ConfigType::TypedConfig(pack(
                type_url::ROUTER,
                &Router::default(),
            ))),
            ..Default::default()
        }],
        // Disabled here, enabled per route for WebSocket endpoints.
        upgrade_configs: vec![http_connection_manager::UpgradeConfig {
            upgrade_type: WEBSOCKET_UPGRADE.to_string(),
            enabled: Some(bool_value(false)),
            ..Default::default()
        }],
        ..Default::default()
    };
    Filter {
        name: type_url::names::HTTP_CONNECTION_MANAGER.to_string(),
        config_type: Some(filter::ConfigType::TypedConfig(pack(
            type_url::HTTP_CONNECTION_MANAGER,
            &hcm,
        ))),
    }
}

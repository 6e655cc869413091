//! Pure constructors for Envoy resources.
//!
//! Builders take primitives and return one value each. They perform no I/O
//! and keep no state, so identical inputs always encode to identical bytes.

mod cluster;
mod endpoint;
mod listener;
mod route;

pub use cluster::{build_cluster, DEFAULT_CONNECT_TIMEOUT, SYSTEM_CA_BUNDLE};
pub use endpoint::{build_endpoint, socket_address};
pub use listener::{
    ads_config_source, build_listener, build_listener_with_sni, SniFilterChain,
    SniListenerConfig, SNI_WILDCARD,
};
pub use route::{
    build_route, build_route_configuration, build_route_for_op, build_virtual_host,
    method_header_matcher, RouteTarget,
};

/// Name of the per-node listener created at node initialization.
pub const SHARED_LISTENER_NAME: &str = "flowc_default_listener";

/// Name of the route-configuration every deployment contributes to.
pub const SHARED_ROUTE_NAME: &str = "flowc_default_route";

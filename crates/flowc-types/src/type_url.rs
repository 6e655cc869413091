//! Type URLs for the resources and extensions flowc emits.

/// Prefix shared by every type URL.
pub const PREFIX: &str = "type.googleapis.com/";

/// `envoy.config.cluster.v3.Cluster`
pub const CLUSTER: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
/// `envoy.config.endpoint.v3.ClusterLoadAssignment`
pub const ENDPOINT: &str = "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";
/// `envoy.config.listener.v3.Listener`
pub const LISTENER: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
/// `envoy.config.route.v3.RouteConfiguration`
pub const ROUTE: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";

/// HTTP connection manager network filter config.
pub const HTTP_CONNECTION_MANAGER: &str = "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";
/// Router HTTP filter config.
pub const ROUTER: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";
/// TLS inspector listener filter config.
pub const TLS_INSPECTOR: &str =
    "type.googleapis.com/envoy.extensions.filters.listener.tls_inspector.v3.TlsInspector";
/// Upstream TLS transport socket config.
pub const UPSTREAM_TLS_CONTEXT: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.UpstreamTlsContext";
/// Previous-hosts retry host predicate config.
pub const PREVIOUS_HOSTS_PREDICATE: &str =
    "type.googleapis.com/envoy.extensions.retry.host.previous_hosts.v3.PreviousHostsPredicate";
/// Upstream HTTP protocol options.
pub const HTTP_PROTOCOL_OPTIONS: &str =
    "type.googleapis.com/envoy.extensions.upstreams.http.v3.HttpProtocolOptions";

/// Well-known Envoy extension names used alongside the type URLs.
pub mod names {
    /// HTTP connection manager network filter.
    pub const HTTP_CONNECTION_MANAGER: &str = "envoy.filters.network.http_connection_manager";
    /// Router HTTP filter.
    pub const ROUTER: &str = "envoy.filters.http.router";
    /// TLS inspector listener filter.
    pub const TLS_INSPECTOR: &str = "envoy.filters.listener.tls_inspector";
    /// TLS transport socket.
    pub const TLS_TRANSPORT_SOCKET: &str = "envoy.transport_sockets.tls";
    /// Previous-hosts retry predicate.
    pub const PREVIOUS_HOSTS: &str = "envoy.retry_host_predicates.previous_hosts";
    /// Key for upstream HTTP protocol options in `typed_extension_protocol_options`.
    pub const HTTP_PROTOCOL_OPTIONS: &str = "envoy.extensions.upstreams.http.v3.HttpProtocolOptions";
}

/// Strip [`PREFIX`] from a type URL, returning the fully-qualified message name.
pub fn message_name(type_url: &str) -> &str {
    type_url.strip_prefix(PREFIX).unwrap_or(type_url)
}

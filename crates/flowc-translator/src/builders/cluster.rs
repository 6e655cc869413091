use std::collections::HashMap;
use std::time::Duration;

use flowc_model::UpstreamScheme;
use flowc_types::pb::envoy::config::cluster::v3::{cluster, Cluster};
use flowc_types::pb::envoy::config::core::v3::{
    data_source, transport_socket, DataSource, Http2ProtocolOptions, TransportSocket,
};
use flowc_types::pb::envoy::extensions::transport_sockets::tls::v3::{
    common_tls_context, CertificateValidationContext, CommonTlsContext, UpstreamTlsContext,
};
use flowc_types::pb::envoy::extensions::upstreams::http::v3::{
    http_protocol_options, HttpProtocolOptions,
};
use flowc_types::{duration, pack, type_url};

use super::build_endpoint;

/// Connect timeout of every generated cluster.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// OS trust bundle used to verify HTTPS upstreams.
pub const SYSTEM_CA_BUNDLE: &str = "/etc/ssl/certs/ca-certificates.crt";

/// LOGICAL_DNS cluster with an embedded single-endpoint load assignment.
///
/// Round-robin, IPv4 only, 5 s connect timeout. `https` upstreams get a TLS
/// transport socket with SNI set to `host`; `http2` upstreams speak
/// cleartext HTTP/2.
pub fn build_cluster(name: &str, host: &str, port: u16, scheme: UpstreamScheme) -> Cluster {
    let mut typed_extension_protocol_options = HashMap::new();
    if scheme == UpstreamScheme::Http2 {
        typed_extension_protocol_options.insert(
            type_url::names::HTTP_PROTOCOL_OPTIONS.to_string(),
            pack(type_url::HTTP_PROTOCOL_OPTIONS, &http2_protocol_options()),
        );
    }

    Cluster {
        name: name.to_string(),
        connect_timeout: Some(duration(DEFAULT_CONNECT_TIMEOUT)),
        cluster_discovery_type: Some(cluster::ClusterDiscoveryType::Type(
            cluster::DiscoveryType::LogicalDns as i32,
        )),
        lb_policy: cluster::LbPolicy::RoundRobin as i32,
        dns_lookup_family: cluster::DnsLookupFamily::V4Only as i32,
        load_assignment: Some(build_endpoint(name, host, port)),
        transport_socket: (scheme == UpstreamScheme::Https).then(|| upstream_tls(host)),
        typed_extension_protocol_options,
        ..Default::default()
    }
}

fn upstream_tls(sni: &str) -> TransportSocket {
    let tls = UpstreamTlsContext {
        sni: sni.to_string(),
        common_tls_context: Some(CommonTlsContext {
            validation_context_type: Some(common_tls_context::ValidationContextType::ValidationContext(
                CertificateValidationContext {
                    trusted_ca: Some(DataSource {
                        specifier: Some(data_source::Specifier::Filename(SYSTEM_CA_BUNDLE.to_string())),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )),
            ..Default::default()
        }),
        ..Default::default()
    };
    TransportSocket {
        name: type_url::names::TLS_TRANSPORT_SOCKET.to_string(),
        config_type: Some(transport_socket::ConfigType::TypedConfig(pack(
            type_url::UPSTREAM_TLS_CONTEXT,
            &tls,
        ))),
    }
}

fn http2_protocol_options() -> HttpProtocolOptions {
    use http_protocol_options::explicit_http_config::ProtocolConfig;

    HttpProtocolOptions {
        upstream_protocol_options: Some(
            http_protocol_options::UpstreamProtocolOptions::ExplicitHttpConfig(
                http_protocol_options::ExplicitHttpConfig {
                    protocol_config: Some(ProtocolConfig::Http2ProtocolOptions(
                        Http2ProtocolOptions::default(),
                    )),
                },
            ),
        ),
        ..Default::default()
    }
}

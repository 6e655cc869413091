use flowc_types::pb::envoy::config::core::v3::{address, socket_address, Address, SocketAddress};
use flowc_types::pb::envoy::config::endpoint::v3::{
    lb_endpoint, ClusterLoadAssignment, Endpoint, LbEndpoint, LocalityLbEndpoints,
};

/// TCP socket address `addr:port`.
pub fn socket_address(addr: &str, port: u16) -> Address {
    Address {
        address: Some(address::Address::SocketAddress(SocketAddress {
            address: addr.to_string(),
            port_specifier: Some(socket_address::PortSpecifier::PortValue(u32::from(port))),
            ..Default::default()
        })),
    }
}

/// Single-locality, single-endpoint load assignment for `cluster`.
pub fn build_endpoint(cluster: &str, addr: &str, port: u16) -> ClusterLoadAssignment {
    ClusterLoadAssignment {
        cluster_name: cluster.to_string(),
        endpoints: vec![LocalityLbEndpoints {
            lb_endpoints: vec![LbEndpoint {
                host_identifier: Some(lb_endpoint::HostIdentifier::Endpoint(Endpoint {
                    address: Some(socket_address(addr, port)),
                    ..Default::default()
                })),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_targets_host_port() {
        let cla = build_endpoint("users-cluster", "10.0.0.7", 9090);
        assert_eq!(cla.cluster_name, "users-cluster");
        assert_eq!(cla.endpoints.len(), 1);
        let lb = &cla.endpoints[0].lb_endpoints;
        assert_eq!(lb.len(), 1);

        let Some(lb_endpoint::HostIdentifier::Endpoint(ep)) = &lb[0].host_identifier else {
            panic!("expected endpoint host identifier");
        };
        let Some(address::Address::SocketAddress(sa)) =
            ep.address.as_ref().and_then(|a| a.address.as_ref())
        else {
            panic!("expected socket address");
        };
        assert_eq!(sa.address, "10.0.0.7");
        assert_eq!(
            sa.port_specifier,
            Some(socket_address::PortSpecifier::PortValue(9090))
        );
    }
}

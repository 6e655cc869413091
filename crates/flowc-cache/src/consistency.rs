//! Referential integrity of a resource set.
//!
//! A set is consistent when every route targets clusters that exist, every
//! listener's RDS reference names an existing route-configuration, no two
//! listeners bind the same socket, and no domain is claimed by two virtual
//! hosts of one route-configuration.

use std::collections::{BTreeSet, HashMap, HashSet};

use flowc_core::{FlowcError, FlowcResult, NodeId, ResourceType, XdsResources};
use flowc_translator::builders::RouteTarget;
use flowc_types::pb::envoy::config::cluster::v3::Cluster;
use flowc_types::pb::envoy::config::core::v3::{address, socket_address};
use flowc_types::pb::envoy::config::listener::v3::{filter, Listener};
use flowc_types::pb::envoy::config::route::v3::RouteConfiguration;
use flowc_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    http_connection_manager, HttpConnectionManager,
};
use flowc_types::{type_url, unpack};

use crate::Snapshot;

/// Check a typed resource bundle.
pub fn check(node: &NodeId, resources: &XdsResources) -> FlowcResult<()> {
    check_parts(
        node,
        resources.clusters.iter(),
        resources.listeners.iter(),
        resources.routes.iter(),
    )
}

/// Check a snapshot.
pub fn check_snapshot(node: &NodeId, snapshot: &Snapshot) -> FlowcResult<()> {
    check_parts(
        node,
        snapshot.typed::<Cluster>(ResourceType::Cluster),
        snapshot.typed::<Listener>(ResourceType::Listener),
        snapshot.typed::<RouteConfiguration>(ResourceType::Route),
    )
}

fn check_parts<'a>(
    node: &NodeId,
    clusters: impl Iterator<Item = &'a Cluster>,
    listeners: impl Iterator<Item = &'a Listener>,
    routes: impl Iterator<Item = &'a RouteConfiguration>,
) -> FlowcResult<()> {
    let clusters: HashSet<&str> = clusters.map(|c| c.name.as_str()).collect();
    let routes: Vec<&RouteConfiguration> = routes.collect();
    let route_names: HashSet<&str> = routes.iter().map(|r| r.name.as_str()).collect();

    for rc in &routes {
        check_route_configuration(node, rc, &clusters)?;
    }

    let mut bound: HashMap<(String, u32), &str> = HashMap::new();
    for listener in listeners {
        if let Some(bind) = bind_address(listener) {
            if let Some(other) = bound.insert(bind.clone(), listener.name.as_str()) {
                return Err(FlowcError::consistency(
                    node.as_str(),
                    format!(
                        "listeners {other} and {} both bind {}:{}",
                        listener.name, bind.0, bind.1
                    ),
                ));
            }
        }

        for hcm in connection_managers(node, listener)? {
            match hcm.route_specifier {
                Some(http_connection_manager::RouteSpecifier::Rds(rds)) => {
                    if !route_names.contains(rds.route_config_name.as_str()) {
                        return Err(FlowcError::consistency(
                            node.as_str(),
                            format!(
                                "listener {} references missing route configuration {}",
                                listener.name, rds.route_config_name
                            ),
                        ));
                    }
                }
                Some(http_connection_manager::RouteSpecifier::RouteConfig(inline)) => {
                    check_route_configuration(node, &inline, &clusters)?;
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn check_route_configuration(
    node: &NodeId,
    rc: &RouteConfiguration,
    clusters: &HashSet<&str>,
) -> FlowcResult<()> {
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    for vhost in &rc.virtual_hosts {
        let domains: BTreeSet<&str> = vhost.domains.iter().map(String::as_str).collect();
        for domain in domains {
            if let Some(other) = claimed.insert(domain, vhost.name.as_str()) {
                return Err(FlowcError::consistency(
                    node.as_str(),
                    format!(
                        "domain {domain} claimed by virtual hosts {other} and {} in {}",
                        vhost.name, rc.name
                    ),
                ));
            }
        }

        for route in &vhost.routes {
            let Some(target) = RouteTarget::of(route) else {
                continue;
            };
            if let Some(missing) = target.cluster_names().into_iter().find(|c| !clusters.contains(c)) {
                return Err(FlowcError::consistency(
                    node.as_str(),
                    format!(
                        "route {} in {} targets missing cluster {missing}",
                        route.name, rc.name
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn bind_address(listener: &Listener) -> Option<(String, u32)> {
    match listener.address.as_ref()?.address.as_ref()? {
        address::Address::SocketAddress(sa) => match sa.port_specifier {
            Some(socket_address::PortSpecifier::PortValue(port)) => Some((sa.address.clone(), port)),
            _ => None,
        },
        _ => None,
    }
}

fn connection_managers(node: &NodeId, listener: &Listener) -> FlowcResult<Vec<HttpConnectionManager>> {
    let mut out = Vec::new();
    for chain in &listener.filter_chains {
        for f in &chain.filters {
            let Some(filter::ConfigType::TypedConfig(any)) = &f.config_type else {
                continue;
            };
            if any.type_url != type_url::HTTP_CONNECTION_MANAGER {
                continue;
            }
            let hcm = unpack::<HttpConnectionManager>(any).map_err(|e| FlowcError::Encoding {
                type_url: any.type_url.clone(),
                message: format!("listener {} on node {node}: {e}", listener.name),
            })?;
            out.push(hcm);
        }
    }
    Ok(out)
}

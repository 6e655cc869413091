use flowc_types::pb::envoy::config::route::v3::{
    header_matcher, route, route_action, route_match, weighted_cluster, HeaderMatcher, Route,
    RouteAction, RouteConfiguration, RouteMatch, VirtualHost, WeightedCluster,
};
use flowc_types::pb::envoy::r#type::matcher::v3::{string_matcher, RegexMatcher, StringMatcher};
use flowc_types::u32_value;

use crate::path::{has_parameters, path_regex};

/// Where a route sends traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteTarget {
    /// All traffic to one cluster.
    Cluster(String),
    /// Traffic split by weight; weights sum to 100.
    Weighted(Vec<(String, u32)>),
}

impl RouteTarget {
    /// Clusters the target refers to.
    #[must_use]
    pub fn cluster_names(&self) -> Vec<&str> {
        match self {
            RouteTarget::Cluster(name) => vec![name.as_str()],
            RouteTarget::Weighted(split) => split.iter().map(|(name, _)| name.as_str()).collect(),
        }
    }

    /// Target of an existing route, if it forwards to clusters.
    #[must_use]
    pub fn of(route: &Route) -> Option<RouteTarget> {
        let Some(route::Action::Route(action)) = &route.action else {
            return None;
        };
        match action.cluster_specifier.as_ref()? {
            route_action::ClusterSpecifier::Cluster(name) => Some(RouteTarget::Cluster(name.clone())),
            route_action::ClusterSpecifier::WeightedClusters(wc) => Some(RouteTarget::Weighted(
                wc.clusters
                    .iter()
                    .map(|c| (c.name.clone(), c.weight.as_ref().map_or(0, |w| w.value)))
                    .collect(),
            )),
            _ => None,
        }
    }

    fn to_specifier(&self) -> route_action::ClusterSpecifier {
        match self {
            RouteTarget::Cluster(name) => route_action::ClusterSpecifier::Cluster(name.clone()),
            RouteTarget::Weighted(split) => {
                route_action::ClusterSpecifier::WeightedClusters(WeightedCluster {
                    clusters: split
                        .iter()
                        .map(|(name, weight)| weighted_cluster::ClusterWeight {
                            name: name.clone(),
                            weight: Some(u32_value(*weight)),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                })
            }
        }
    }
}

/// Exact-match on the `:method` pseudo-header.
pub fn method_header_matcher(method: &str) -> HeaderMatcher {
    HeaderMatcher {
        name: ":method".to_string(),
        header_match_specifier: Some(header_matcher::HeaderMatchSpecifier::StringMatch(
            StringMatcher {
                match_pattern: Some(string_matcher::MatchPattern::Exact(method.to_ascii_uppercase())),
                ..Default::default()
            },
        )),
        ..Default::default()
    }
}

/// Route for one operation.
///
/// Exact path match when `path` has no `{param}`, otherwise an anchored safe
/// regex with each parameter matching one segment.
pub fn build_route_for_op(path: &str, method: &str, cluster: &str) -> Route {
    let path_specifier = if has_parameters(path) {
        route_match::PathSpecifier::SafeRegex(RegexMatcher {
            regex: path_regex(path),
            ..Default::default()
        })
    } else {
        route_match::PathSpecifier::Path(path.to_string())
    };
    let route_match = RouteMatch {
        path_specifier: Some(path_specifier),
        headers: vec![method_header_matcher(method)],
        ..Default::default()
    };
    build_route(
        &format!("{} {}", method.to_ascii_uppercase(), path),
        route_match,
        &RouteTarget::Cluster(cluster.to_string()),
    )
}

/// Route forwarding `route_match` to `target`.
pub fn build_route(name: &str, route_match: RouteMatch, target: &RouteTarget) -> Route {
    Route {
        name: name.to_string(),
        r#match: Some(route_match),
        action: Some(route::Action::Route(RouteAction {
            cluster_specifier: Some(target.to_specifier()),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Virtual host serving `domains`.
pub fn build_virtual_host(name: &str, domains: Vec<String>, routes: Vec<Route>) -> VirtualHost {
    VirtualHost {
        name: name.to_string(),
        domains,
        routes,
        ..Default::default()
    }
}

/// Route-configuration with the given virtual hosts.
pub fn build_route_configuration(name: &str, virtual_hosts: Vec<VirtualHost>) -> RouteConfiguration {
    RouteConfiguration {
        name: name.to_string(),
        virtual_hosts,
        ..Default::default()
    }
}

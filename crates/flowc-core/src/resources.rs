//! Typed resource bundle produced by translation.

use std::sync::Arc;

use flowc_types::pb::envoy::config::cluster::v3::Cluster;
use flowc_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use flowc_types::pb::envoy::config::listener::v3::Listener;
use flowc_types::pb::envoy::config::route::v3::RouteConfiguration;

use crate::{BoxResource, ResourceType};

/// Clusters, endpoints, listeners and route-configurations for one
/// translation or one deployment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XdsResources {
    /// CDS resources.
    pub clusters: Vec<Cluster>,
    /// EDS resources.
    pub endpoints: Vec<ClusterLoadAssignment>,
    /// LDS resources.
    pub listeners: Vec<Listener>,
    /// RDS resources.
    pub routes: Vec<RouteConfiguration>,
}

impl XdsResources {
    /// Empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no resources of any kind are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
            && self.endpoints.is_empty()
            && self.listeners.is_empty()
            && self.routes.is_empty()
    }

    /// Total resource count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len() + self.endpoints.len() + self.listeners.len() + self.routes.len()
    }

    /// Names of the clusters, in order.
    pub fn cluster_names(&self) -> impl Iterator<Item = &str> {
        self.clusters.iter().map(|c| c.name.as_str())
    }

    /// Resources of one kind as shared handles, in bundle order.
    #[must_use]
    pub fn boxed(&self, resource_type: ResourceType) -> Vec<BoxResource> {
        match resource_type {
            ResourceType::Cluster => self.clusters.iter().map(|r| Arc::new(r.clone()) as BoxResource).collect(),
            ResourceType::Endpoint => self.endpoints.iter().map(|r| Arc::new(r.clone()) as BoxResource).collect(),
            ResourceType::Route => self.routes.iter().map(|r| Arc::new(r.clone()) as BoxResource).collect(),
            ResourceType::Listener => self.listeners.iter().map(|r| Arc::new(r.clone()) as BoxResource).collect(),
        }
    }
}

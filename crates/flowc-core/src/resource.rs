//! The [`Resource`] trait over Envoy resource messages.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use flowc_types::pb::envoy::config::cluster::v3::Cluster;
use flowc_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use flowc_types::pb::envoy::config::listener::v3::Listener;
use flowc_types::pb::envoy::config::route::v3::RouteConfiguration;

use crate::ResourceType;

/// An xDS resource that can be stored in a snapshot and served over ADS.
///
/// Implemented for the four Envoy messages flowc produces. Snapshots hold
/// them as [`BoxResource`] and downcast through [`Resource::as_any`] when a
/// typed view is needed.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Kind of the resource.
    fn resource_type(&self) -> ResourceType;

    /// Resource name (the key Envoy subscribes by).
    fn name(&self) -> &str;

    /// Encode into `google.protobuf.Any`.
    fn encode(&self) -> flowc_types::Any;

    /// Convert to `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Shared, immutable resource handle.
pub type BoxResource = Arc<dyn Resource>;

macro_rules! impl_resource {
    ($ty:ty, $kind:expr, $name:ident) => {
        impl Resource for $ty {
            fn resource_type(&self) -> ResourceType {
                $kind
            }

            fn name(&self) -> &str {
                &self.$name
            }

            fn encode(&self) -> flowc_types::Any {
                flowc_types::pack($kind.type_url(), self)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

impl_resource!(Cluster, ResourceType::Cluster, name);
impl_resource!(ClusterLoadAssignment, ResourceType::Endpoint, cluster_name);
impl_resource!(RouteConfiguration, ResourceType::Route, name);
impl_resource!(Listener, ResourceType::Listener, name);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_resource() {
        let cluster = Cluster {
            name: "api-cluster".into(),
            ..Default::default()
        };
        let boxed: BoxResource = Arc::new(cluster);
        assert_eq!(boxed.name(), "api-cluster");
        assert_eq!(boxed.resource_type(), ResourceType::Cluster);
        assert_eq!(boxed.encode().type_url, ResourceType::Cluster.type_url());
        assert!(boxed.as_any().downcast_ref::<Cluster>().is_some());
    }

    #[test]
    fn load_assignment_named_by_cluster() {
        let cla = ClusterLoadAssignment {
            cluster_name: "api-cluster".into(),
            ..Default::default()
        };
        assert_eq!(Resource::name(&cla), "api-cluster");
    }
}

//! The xDS resource kinds flowc serves.

use std::fmt;

use flowc_types::type_url;

/// One of the four xDS resource kinds in a snapshot.
///
/// The derived ordering follows [`ResourceType::PUSH_ORDER`], so a
/// `BTreeMap<ResourceType, _>` iterates in the order Envoy needs resources
/// delivered.
///
/// ```rust
/// use flowc_core::ResourceType;
///
/// let rt = ResourceType::from_type_url(
///     "type.googleapis.com/envoy.config.route.v3.RouteConfiguration",
/// );
/// assert_eq!(rt, Some(ResourceType::Route));
/// assert_eq!(ResourceType::Route.short_name(), "RDS");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// `Cluster` (CDS).
    Cluster,
    /// `ClusterLoadAssignment` (EDS).
    Endpoint,
    /// `RouteConfiguration` (RDS).
    Route,
    /// `Listener` (LDS).
    Listener,
}

impl ResourceType {
    /// Dependency order for pushes: clusters before the routes naming them,
    /// routes before the listeners naming them.
    pub const PUSH_ORDER: [ResourceType; 4] = [
        ResourceType::Cluster,
        ResourceType::Endpoint,
        ResourceType::Route,
        ResourceType::Listener,
    ];

    /// Full type URL.
    #[must_use]
    pub const fn type_url(self) -> &'static str {
        match self {
            ResourceType::Cluster => type_url::CLUSTER,
            ResourceType::Endpoint => type_url::ENDPOINT,
            ResourceType::Route => type_url::ROUTE,
            ResourceType::Listener => type_url::LISTENER,
        }
    }

    /// Parse a type URL. Unknown URLs yield `None`.
    #[must_use]
    pub fn from_type_url(url: &str) -> Option<Self> {
        Self::PUSH_ORDER.into_iter().find(|rt| rt.type_url() == url)
    }

    /// Discovery service abbreviation, used in logs and metrics labels.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            ResourceType::Cluster => "CDS",
            ResourceType::Endpoint => "EDS",
            ResourceType::Route => "RDS",
            ResourceType::Listener => "LDS",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_url_round_trip() {
        for rt in ResourceType::PUSH_ORDER {
            assert_eq!(ResourceType::from_type_url(rt.type_url()), Some(rt));
        }
    }

    #[test]
    fn unknown_type_url() {
        assert_eq!(
            ResourceType::from_type_url(
                "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.Secret"
            ),
            None
        );
    }

    #[test]
    fn ordering_matches_push_order() {
        let mut all = vec![
            ResourceType::Listener,
            ResourceType::Route,
            ResourceType::Endpoint,
            ResourceType::Cluster,
        ];
        all.sort();
        assert_eq!(all, ResourceType::PUSH_ORDER.to_vec());
    }
}

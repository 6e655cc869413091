//! Snapshot: the immutable resource set served to one node.
//!
//! A snapshot holds clusters, endpoints, listeners and route-configurations
//! at a single [`SnapshotVersion`]. Resources are keyed by name inside each
//! type so iteration order, and therefore the encoded bytes, are stable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use flowc_core::{BoxResource, Resource, ResourceType, SnapshotVersion, XdsResources};
use flowc_types::Any;

/// Resources of one type within a snapshot, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct SnapshotResources {
    resources: BTreeMap<String, BoxResource>,
}

impl SnapshotResources {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources.
    #[inline]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resource by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&BoxResource> {
        self.resources.get(name)
    }

    /// Whether a resource with `name` is present.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Iterate in name order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BoxResource)> {
        self.resources.iter()
    }

    /// Names in order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }

    fn insert(&mut self, resource: BoxResource) {
        self.resources.insert(resource.name().to_string(), resource);
    }
}

/// An immutable, versioned set of xDS resources for a node.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: SnapshotVersion,
    resources: BTreeMap<ResourceType, SnapshotResources>,
    created_at: Instant,
}

impl Snapshot {
    /// Create a snapshot builder.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Snapshot holding every resource of `resources` at `version`.
    pub fn from_resources(version: SnapshotVersion, resources: &XdsResources) -> Self {
        let mut builder = SnapshotBuilder::new().version(version);
        for kind in ResourceType::PUSH_ORDER {
            builder = builder.resources(kind, resources.boxed(kind));
        }
        builder.build()
    }

    /// Snapshot version.
    #[inline]
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// Creation timestamp.
    #[inline]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Resources of one type, if any were added.
    #[inline]
    pub fn get_resources(&self, kind: ResourceType) -> Option<&SnapshotResources> {
        self.resources.get(&kind)
    }

    /// Whether a resource of `kind` named `name` is present.
    pub fn contains(&self, kind: ResourceType, name: &str) -> bool {
        self.resources.get(&kind).is_some_and(|r| r.contains(name))
    }

    /// Typed view of the resources of `kind`.
    ///
    /// Resources stored under `kind` whose concrete type is not `T` are
    /// skipped.
    pub fn typed<T: 'static>(&self, kind: ResourceType) -> impl Iterator<Item = &T> {
        self.resources
            .get(&kind)
            .into_iter()
            .flat_map(|r| r.iter())
            .filter_map(|(_, res)| res.as_any().downcast_ref::<T>())
    }

    /// Encode resources of `kind`, in name order.
    ///
    /// An empty `names` selects everything; otherwise only the named
    /// resources that exist are returned.
    pub fn encoded(&self, kind: ResourceType, names: &[String]) -> Vec<Any> {
        let Some(resources) = self.resources.get(&kind) else {
            return Vec::new();
        };
        if names.is_empty() {
            return resources.iter().map(|(_, r)| r.encode()).collect();
        }
        resources
            .iter()
            .filter(|(name, _)| names.iter().any(|n| n == *name))
            .map(|(_, r)| r.encode())
            .collect()
    }

    /// Resource kinds present, in push order.
    pub fn resource_types(&self) -> impl Iterator<Item = ResourceType> + '_ {
        self.resources.keys().copied()
    }

    /// Total number of resources.
    pub fn total_resources(&self) -> usize {
        self.resources.values().map(SnapshotResources::len).sum()
    }

    /// Whether no resources are present.
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(SnapshotResources::is_empty)
    }

    /// Same resources, different version.
    #[must_use]
    pub fn with_version(&self, version: SnapshotVersion) -> Self {
        Self {
            version,
            resources: self.resources.clone(),
            created_at: Instant::now(),
        }
    }

    /// Whether both snapshots encode to the same bytes, ignoring version.
    pub fn same_resources(&self, other: &Snapshot) -> bool {
        ResourceType::PUSH_ORDER
            .into_iter()
            .all(|kind| self.encoded(kind, &[]) == other.encoded(kind, &[]))
    }
}

/// Builder for [`Snapshot`].
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    version: Option<SnapshotVersion>,
    resources: BTreeMap<ResourceType, SnapshotResources>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the version. Defaults to [`SnapshotVersion::initial`].
    pub fn version(mut self, version: SnapshotVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Add one resource. A later resource with the same name replaces it.
    pub fn resource(mut self, resource: BoxResource) -> Self {
        self.resources
            .entry(resource.resource_type())
            .or_default()
            .insert(resource);
        self
    }

    /// Add resources of one kind; the kind is recorded even when empty.
    pub fn resources(mut self, kind: ResourceType, resources: Vec<BoxResource>) -> Self {
        let entry = self.resources.entry(kind).or_default();
        for resource in resources {
            entry.insert(resource);
        }
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            version: self.version.unwrap_or_else(SnapshotVersion::initial),
            resources: self.resources,
            created_at: Instant::now(),
        }
    }
}

/// Convenience for wrapping a concrete resource.
pub fn boxed<R: Resource + 'static>(resource: R) -> BoxResource {
    Arc::new(resource)
}

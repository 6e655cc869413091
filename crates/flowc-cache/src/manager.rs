//! Deployment manager: per-node composition of deployed APIs.
//!
//! Each node has a base (the shared listener and its route-configuration,
//! created by [`DeploymentManager::initialize_node`]) and an ordered list of
//! deployment contributions. Every mutation recomputes the node's resource
//! set from the base plus all contributions, checks it for consistency and
//! publishes it under the next version. A failed check leaves the node
//! untouched.
//!
//! Contributions to [`SHARED_ROUTE_NAME`] merge: virtual hosts with the same
//! domain set are combined by appending routes in deployment order, other
//! virtual hosts are added alongside. Every other resource is keyed by name
//! and a later contribution replaces an earlier one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use fnv::FnvBuildHasher;
use flowc_core::{FlowcError, FlowcResult, NodeId, SnapshotVersion, XdsResources};
use flowc_translator::builders::{
    build_listener, build_route_configuration, SHARED_LISTENER_NAME, SHARED_ROUTE_NAME,
};
use flowc_types::pb::envoy::config::route::v3::{RouteConfiguration, VirtualHost};
use tracing::{debug, info, warn};

use crate::cache::{Cache, ShardedCache};
use crate::consistency;
use crate::snapshot::Snapshot;

/// Resources one deployment contributes to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentResources {
    /// Deployment identifier, unique per node.
    pub deployment_id: String,
    /// API name.
    pub api_name: String,
    /// API version.
    pub api_version: String,
    /// Translated resources.
    pub resources: XdsResources,
}

impl DeploymentResources {
    /// Bundle translated resources under a deployment id.
    pub fn new(
        deployment_id: impl Into<String>,
        api_name: impl Into<String>,
        api_version: impl Into<String>,
        resources: XdsResources,
    ) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            api_name: api_name.into(),
            api_version: api_version.into(),
            resources,
        }
    }
}

/// Summary of a deployment held for a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentInfo {
    /// Deployment identifier.
    pub deployment_id: String,
    /// API name.
    pub api_name: String,
    /// API version.
    pub api_version: String,
    /// Resource count contributed.
    pub resource_count: usize,
}

#[derive(Debug, Default)]
struct NodeState {
    listener_port: Option<u16>,
    base: XdsResources,
    deployments: Vec<DeploymentResources>,
    removed: bool,
}

/// Publishes composed per-node snapshots into a [`ShardedCache`].
#[derive(Debug)]
pub struct DeploymentManager {
    cache: Arc<ShardedCache>,
    nodes: DashMap<NodeId, Arc<Mutex<NodeState>>, FnvBuildHasher>,
    // Highest version published per node; survives remove_node.
    versions: DashMap<NodeId, SnapshotVersion, FnvBuildHasher>,
}

impl DeploymentManager {
    /// Manager publishing into `cache`.
    pub fn new(cache: Arc<ShardedCache>) -> Self {
        Self {
            cache,
            nodes: DashMap::with_hasher(FnvBuildHasher::default()),
            versions: DashMap::with_hasher(FnvBuildHasher::default()),
        }
    }

    /// The cache snapshots are published into.
    pub fn cache(&self) -> &Arc<ShardedCache> {
        &self.cache
    }

    /// Create the shared listener on `listener_port` for `node`.
    ///
    /// The listener routes through an initially empty [`SHARED_ROUTE_NAME`]
    /// configuration. Repeating the call with the same port is a no-op;
    /// a different port rebuilds the listener.
    pub fn initialize_node(&self, node: &NodeId, listener_port: u16) -> FlowcResult<SnapshotVersion> {
        if listener_port == 0 {
            return Err(FlowcError::validation("listener_port", "must be non-zero"));
        }
        self.with_node(node, |state| {
            if state.listener_port == Some(listener_port) {
                if let Some(current) = self.cache.get_snapshot(node) {
                    return Ok(current.version());
                }
            }
            let base = XdsResources {
                listeners: vec![build_listener(SHARED_LISTENER_NAME, SHARED_ROUTE_NAME, listener_port)],
                routes: vec![build_route_configuration(SHARED_ROUTE_NAME, Vec::new())],
                ..Default::default()
            };
            let version = self.publish(node, &base, &state.deployments)?;
            state.base = base;
            state.listener_port = Some(listener_port);
            info!(node = %node, port = listener_port, version = %version, "initialized node");
            Ok(version)
        })
    }

    /// Add or replace a deployment on `node`.
    ///
    /// A node seen for the first time starts with an empty base. Fails when
    /// another deployment already holds the same API name and version, or
    /// when the composed snapshot is inconsistent.
    pub fn deploy_api(&self, node: &NodeId, deployment: DeploymentResources) -> FlowcResult<SnapshotVersion> {
        if deployment.deployment_id.is_empty() {
            return Err(FlowcError::validation("deployment_id", "must not be empty"));
        }
        self.with_node(node, |state| {
            if let Some(clash) = state.deployments.iter().find(|d| {
                d.deployment_id != deployment.deployment_id
                    && d.api_name == deployment.api_name
                    && d.api_version == deployment.api_version
            }) {
                return Err(FlowcError::validation(
                    "deployment",
                    format!(
                        "{} {} is already deployed on node {node} as {}",
                        deployment.api_name, deployment.api_version, clash.deployment_id
                    ),
                ));
            }

            let mut candidate = state.deployments.clone();
            match candidate
                .iter_mut()
                .find(|d| d.deployment_id == deployment.deployment_id)
            {
                Some(existing) => *existing = deployment.clone(),
                None => candidate.push(deployment.clone()),
            }

            let version = self.publish(node, &state.base, &candidate)?;
            state.deployments = candidate;
            info!(
                node = %node,
                deployment = %deployment.deployment_id,
                api = %deployment.api_name,
                api_version = %deployment.api_version,
                version = %version,
                "deployed api"
            );
            Ok(version)
        })
    }

    /// Remove a deployment from `node`.
    ///
    /// Returns the new version, or `None` when the node had no base and its
    /// last deployment was removed. In that case the snapshot is cleared and
    /// the node is forgotten, as if it had never been deployed to; open
    /// watches stay registered.
    pub fn undeploy_api(&self, node: &NodeId, deployment_id: &str) -> FlowcResult<Option<SnapshotVersion>> {
        let entry = self
            .nodes
            .get(node)
            .map(|s| Arc::clone(&*s))
            .ok_or_else(|| FlowcError::NodeNotFound { node_id: node.to_string() })?;
        let mut state = lock(&entry)?;
        if state.removed {
            return Err(FlowcError::NodeNotFound { node_id: node.to_string() });
        }

        let Some(pos) = state
            .deployments
            .iter()
            .position(|d| d.deployment_id == deployment_id)
        else {
            return Err(FlowcError::DeploymentNotFound {
                node_id: node.to_string(),
                deployment_id: deployment_id.to_string(),
            });
        };

        let mut candidate = state.deployments.clone();
        candidate.remove(pos);

        if candidate.is_empty() && state.base.is_empty() {
            state.deployments = candidate;
            state.removed = true;
            self.nodes.remove_if(node, |_, held| Arc::ptr_eq(held, &entry));
            self.cache.clear_snapshot(node);
            info!(node = %node, deployment = %deployment_id, "undeployed last api, cleared snapshot");
            return Ok(None);
        }

        let version = self.publish(node, &state.base, &candidate)?;
        state.deployments = candidate;
        info!(node = %node, deployment = %deployment_id, version = %version, "undeployed api");
        Ok(Some(version))
    }

    /// Drop all state for `node` and close its watches.
    pub fn remove_node(&self, node: &NodeId) -> FlowcResult<()> {
        let Some((_, state)) = self.nodes.remove(node) else {
            return Err(FlowcError::NodeNotFound { node_id: node.to_string() });
        };
        let mut state = lock(&state)?;
        state.removed = true;
        self.cache.remove_node(node);
        info!(node = %node, "removed node");
        Ok(())
    }

    /// Nodes with state, sorted.
    pub fn list_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.nodes.iter().map(|r| r.key().clone()).collect();
        nodes.sort();
        nodes
    }

    /// Deployments on `node`, in deployment order.
    pub fn list_deployments(&self, node: &NodeId) -> FlowcResult<Vec<DeploymentInfo>> {
        let state = self
            .nodes
            .get(node)
            .map(|s| Arc::clone(&*s))
            .ok_or_else(|| FlowcError::NodeNotFound { node_id: node.to_string() })?;
        let state = lock(&state)?;
        Ok(state
            .deployments
            .iter()
            .map(|d| DeploymentInfo {
                deployment_id: d.deployment_id.clone(),
                api_name: d.api_name.clone(),
                api_version: d.api_version.clone(),
                resource_count: d.resources.len(),
            })
            .collect())
    }

    /// Current snapshot for `node`.
    pub fn snapshot(&self, node: &NodeId) -> Option<Arc<Snapshot>> {
        self.cache.get_snapshot(node)
    }

    /// Run `f` under the node's lock, creating the node if needed.
    fn with_node<T>(
        &self,
        node: &NodeId,
        f: impl FnOnce(&mut NodeState) -> FlowcResult<T>,
    ) -> FlowcResult<T> {
        loop {
            let state = self.nodes.entry(node.clone()).or_default().clone();
            let mut guard = lock(&state)?;
            // Removed between lookup and lock; retry against the fresh entry.
            if guard.removed {
                continue;
            }
            let result = f(&mut guard);
            // A node created by a failed first call leaves no trace.
            if result.is_err() && guard.base.is_empty() && guard.deployments.is_empty() {
                guard.removed = true;
                self.nodes.remove_if(node, |_, held| Arc::ptr_eq(held, &state));
            }
            return result;
        }
    }

    /// Compose, check and publish. The caller holds the node lock.
    fn publish(
        &self,
        node: &NodeId,
        base: &XdsResources,
        deployments: &[DeploymentResources],
    ) -> FlowcResult<SnapshotVersion> {
        let composed = match compose(node, base, deployments)
            .and_then(|composed| consistency::check(node, &composed).map(|()| composed))
        {
            Ok(composed) => composed,
            Err(err) => {
                self.cache.stats().record_rejection();
                warn!(node = %node, error = %err, "rejected inconsistent snapshot");
                return Err(err);
            }
        };

        let version = self.next_version(node);
        self.cache
            .set_snapshot(node, Snapshot::from_resources(version, &composed))?;
        self.versions.insert(node.clone(), version);
        debug!(node = %node, version = %version, resources = composed.len(), "published snapshot");
        Ok(version)
    }

    fn next_version(&self, node: &NodeId) -> SnapshotVersion {
        let published = self.versions.get(node).map(|v| *v);
        let held = self.cache.get_snapshot(node).map(|s| s.version());
        match published.max(held) {
            Some(v) => v.next(),
            None => SnapshotVersion::initial(),
        }
    }
}

fn lock(state: &Mutex<NodeState>) -> FlowcResult<MutexGuard<'_, NodeState>> {
    state
        .lock()
        .map_err(|_| FlowcError::internal("node state lock poisoned"))
}

/// Merge the base and every contribution into one resource set.
fn compose(
    node: &NodeId,
    base: &XdsResources,
    deployments: &[DeploymentResources],
) -> FlowcResult<XdsResources> {
    let mut clusters = BTreeMap::new();
    let mut endpoints = BTreeMap::new();
    let mut listeners = BTreeMap::new();
    let mut routes: BTreeMap<String, RouteConfiguration> = BTreeMap::new();

    for part in std::iter::once(base).chain(deployments.iter().map(|d| &d.resources)) {
        for c in &part.clusters {
            clusters.insert(c.name.clone(), c.clone());
        }
        for e in &part.endpoints {
            endpoints.insert(e.cluster_name.clone(), e.clone());
        }
        for l in &part.listeners {
            listeners.insert(l.name.clone(), l.clone());
        }
        for rc in &part.routes {
            match routes.get_mut(&rc.name) {
                Some(existing) if rc.name == SHARED_ROUTE_NAME => {
                    merge_virtual_hosts(node, existing, &rc.virtual_hosts)?;
                }
                _ => {
                    routes.insert(rc.name.clone(), rc.clone());
                }
            }
        }
    }

    Ok(XdsResources {
        clusters: clusters.into_values().collect(),
        endpoints: endpoints.into_values().collect(),
        listeners: listeners.into_values().collect(),
        routes: routes.into_values().collect(),
    })
}

fn merge_virtual_hosts(
    node: &NodeId,
    target: &mut RouteConfiguration,
    incoming: &[VirtualHost],
) -> FlowcResult<()> {
    for vhost in incoming {
        let domains: BTreeSet<&str> = vhost.domains.iter().map(String::as_str).collect();
        let same = target
            .virtual_hosts
            .iter_mut()
            .find(|v| v.domains.iter().map(String::as_str).collect::<BTreeSet<_>>() == domains);
        match same {
            Some(existing) => existing.routes.extend(vhost.routes.iter().cloned()),
            None => {
                if let Some(overlap) = target
                    .virtual_hosts
                    .iter()
                    .find(|v| v.domains.iter().any(|d| domains.contains(d.as_str())))
                {
                    return Err(FlowcError::consistency(
                        node.as_str(),
                        format!(
                            "virtual host {} partially overlaps domains of {} in {}",
                            vhost.name, overlap.name, target.name
                        ),
                    ));
                }
                target.virtual_hosts.push(vhost.clone());
            }
        }
    }
    Ok(())
}

//! End-to-end orchestration of API deployments.

use std::sync::Arc;

use flowc_cache::{DeploymentInfo, DeploymentManager, DeploymentResources, ShardedCache, Snapshot};
use flowc_core::{FlowcError, FlowcResult, NodeId, SnapshotVersion, XdsResources};
use flowc_model::{Api, ApiDeployment, StrategyConfig};
use flowc_translator::{CompositeTranslator, ConfigResolver, StrategyFactory, Translator};
use tracing::{info, warn};

/// Resolves strategies, translates and publishes deployments.
///
/// ```rust
/// use std::sync::Arc;
/// use flowc::prelude::*;
///
/// let control_plane = ControlPlane::new(Arc::new(ShardedCache::new()));
/// let node = NodeId::new("edge-1");
/// control_plane.initialize_node(&node, 10000).unwrap();
///
/// let deployment = ApiDeployment::new(FlowcMetadata {
///     name: "users-api".into(),
///     version: "v1".into(),
///     upstream: UpstreamConfig { host: "users.svc".into(), port: 8080, ..Default::default() },
///     gateway: GatewayTarget { node_id: "edge-1".into(), ..Default::default() },
///     ..Default::default()
/// });
/// let api = Api::new(ApiType::Rest, "users-api", "v1")
///     .with_base_path("/users")
///     .with_endpoint(Endpoint::new("list", "GET", "/"));
///
/// let version = control_plane.deploy(&deployment, &api).unwrap();
/// assert_eq!(version.as_u64(), 2);
/// ```
#[derive(Debug)]
pub struct ControlPlane {
    resolver: ConfigResolver,
    factory: StrategyFactory,
    manager: Arc<DeploymentManager>,
}

impl ControlPlane {
    /// Control plane publishing into `cache` with built-in strategy defaults.
    pub fn new(cache: Arc<ShardedCache>) -> Self {
        Self::with_resolver(cache, ConfigResolver::new())
    }

    /// Control plane whose gateway-wide strategy defaults sit between the
    /// built-in defaults and per-API configuration.
    pub fn with_gateway_defaults(cache: Arc<ShardedCache>, defaults: StrategyConfig) -> Self {
        Self::with_resolver(cache, ConfigResolver::with_gateway_defaults(defaults))
    }

    fn with_resolver(cache: Arc<ShardedCache>, resolver: ConfigResolver) -> Self {
        Self {
            resolver,
            factory: StrategyFactory::new(),
            manager: Arc::new(DeploymentManager::new(cache)),
        }
    }

    /// The cache snapshots are published to.
    pub fn cache(&self) -> &Arc<ShardedCache> {
        self.manager.cache()
    }

    /// The underlying deployment manager.
    pub fn manager(&self) -> &Arc<DeploymentManager> {
        &self.manager
    }

    /// Give `node` its shared listener on `listener_port`.
    pub fn initialize_node(&self, node: &NodeId, listener_port: u16) -> FlowcResult<SnapshotVersion> {
        self.manager.initialize_node(node, listener_port)
    }

    /// Translate without publishing.
    pub fn translate(&self, deployment: &ApiDeployment, api: &Api) -> FlowcResult<XdsResources> {
        let node = target_node(deployment)?;
        let config = self.resolver.resolve(deployment.strategy());
        let strategies = self.factory.create(&config, deployment)?;
        CompositeTranslator::new(strategies)?.translate(deployment, api, &node)
    }

    /// Translate `api` for `deployment` and publish it on the deployment's
    /// node. Nothing is published when any step fails.
    pub fn deploy(&self, deployment: &ApiDeployment, api: &Api) -> FlowcResult<SnapshotVersion> {
        let node = target_node(deployment)?;
        let resources = self.translate(deployment, api).map_err(|e| {
            warn!(deployment = %deployment.id, node = %node, error = %e, "translation failed");
            e
        })?;

        let version = self.manager.deploy_api(
            &node,
            DeploymentResources::new(
                deployment.id.clone(),
                deployment.name.clone(),
                deployment.version.clone(),
                resources,
            ),
        )?;
        info!(
            deployment = %deployment.id,
            node = %node,
            version = %version,
            "deployment published"
        );
        Ok(version)
    }

    /// Remove a deployment from `node`.
    ///
    /// Returns `None` when the node had no base and is now empty.
    pub fn undeploy(&self, node: &NodeId, deployment_id: &str) -> FlowcResult<Option<SnapshotVersion>> {
        self.manager.undeploy_api(node, deployment_id)
    }

    /// Forget `node` and close its streams.
    pub fn remove_node(&self, node: &NodeId) -> FlowcResult<()> {
        self.manager.remove_node(node)
    }

    /// Known nodes, sorted.
    pub fn list_nodes(&self) -> Vec<NodeId> {
        self.manager.list_nodes()
    }

    /// Deployments on `node`, in deployment order.
    pub fn list_deployments(&self, node: &NodeId) -> FlowcResult<Vec<DeploymentInfo>> {
        self.manager.list_deployments(node)
    }

    /// Current snapshot of `node`.
    pub fn snapshot(&self, node: &NodeId) -> Option<Arc<Snapshot>> {
        self.manager.snapshot(node)
    }
}

fn target_node(deployment: &ApiDeployment) -> FlowcResult<NodeId> {
    let id = deployment.gateway().node_id.trim();
    if id.is_empty() {
        return Err(FlowcError::validation(
            "gateway.node_id",
            format!("deployment {} names no target node", deployment.id),
        ));
    }
    Ok(NodeId::new(id))
}

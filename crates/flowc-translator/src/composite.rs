//! The seven-phase composite translator.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use flowc_core::{FlowcError, FlowcResult, NodeId, XdsResources};
use flowc_model::{Api, ApiDeployment, Endpoint};
use flowc_types::pb::envoy::config::cluster::v3::Cluster;
use flowc_types::pb::envoy::config::listener::v3::Listener;
use flowc_types::pb::envoy::config::route::v3::{
    route, route_action, route_match, Route, RouteConfiguration, RouteMatch,
};
use flowc_types::{bool_value, duration, Message};
use tracing::{debug, info_span};

use crate::builders::{
    build_listener, build_route, build_route_configuration, build_virtual_host, SHARED_ROUTE_NAME,
};
use crate::path::join_path;
use crate::strategy::{
    DeploymentStrategy, LoadBalancingStrategy, NoRetry, NoopObservability, NoopRateLimit,
    ObservabilityStrategy, RateLimitStrategy, RetryStrategy, RoundRobinLoadBalancing,
    RouteMatchStrategy, StrategySet,
};
use crate::Translator;

const WEBSOCKET_UPGRADE: &str = "websocket";

/// Translator assembled from a [`StrategySet`].
///
/// Stateless across calls: one instance may translate distinct deployments
/// from several threads at once.
#[derive(Debug)]
pub struct CompositeTranslator {
    deployment: Box<dyn DeploymentStrategy>,
    route_match: Box<dyn RouteMatchStrategy>,
    load_balancing: Box<dyn LoadBalancingStrategy>,
    retry: Box<dyn RetryStrategy>,
    rate_limit: Box<dyn RateLimitStrategy>,
    observability: Box<dyn ObservabilityStrategy>,
}

impl CompositeTranslator {
    /// Build from a strategy set.
    ///
    /// Fails when the deployment or route-match strategy is missing. The
    /// remaining slots default to round-robin and no-ops.
    pub fn new(strategies: StrategySet) -> FlowcResult<Self> {
        let StrategySet {
            deployment,
            route_match,
            load_balancing,
            retry,
            rate_limit,
            observability,
        } = strategies;

        let deployment = deployment
            .ok_or_else(|| FlowcError::configuration("strategy set has no deployment strategy"))?;
        let route_match = route_match
            .ok_or_else(|| FlowcError::configuration("strategy set has no route-match strategy"))?;

        Ok(Self {
            deployment,
            route_match,
            load_balancing: load_balancing.unwrap_or_else(|| Box::new(RoundRobinLoadBalancing)),
            retry: retry.unwrap_or_else(|| Box::new(NoRetry)),
            rate_limit: rate_limit.unwrap_or_else(|| Box::new(NoopRateLimit)),
            observability: observability.unwrap_or_else(|| Box::new(NoopObservability)),
        })
    }

    fn generate_clusters(&self, deployment: &ApiDeployment) -> FlowcResult<Vec<Cluster>> {
        let clusters = self.deployment.generate_clusters(deployment)?;
        if clusters.is_empty() {
            return Err(FlowcError::translation(
                "cluster generation",
                format!("{} strategy produced no clusters", self.deployment.name()),
            ));
        }
        Ok(clusters)
    }

    fn apply_load_balancing(&self, clusters: &mut [Cluster], deployment: &ApiDeployment) -> FlowcResult<()> {
        for cluster in clusters {
            self.load_balancing.configure_cluster(cluster, deployment)?;
        }
        Ok(())
    }

    fn generate_routes(&self, deployment: &ApiDeployment, ir: &Api) -> FlowcResult<RouteConfiguration> {
        let base_path = base_path(deployment, ir);
        let target = self.deployment.route_target(deployment);
        let hash_policies = self.load_balancing.route_hash_policies();
        let upstream_timeout = deployment.upstream().timeout;

        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(ir.endpoints.len());
        for endpoint in &ir.endpoints {
            let full_path = join_path(&base_path, &endpoint.path_pattern);
            let method = endpoint.method.to_ascii_uppercase();
            let route_match = self.route_match.create_matcher(&full_path, &method, endpoint);
            if !seen.insert(match_key(&route_match)) {
                return Err(FlowcError::configuration(format!(
                    "endpoint {} duplicates the match of an earlier route for {method} {full_path}",
                    endpoint.id
                )));
            }

            let name = format!("{}-{}-{}", deployment.name, deployment.version, endpoint.id);
            let mut route = build_route(&name, route_match, &target);
            shape_action(&mut route, endpoint, upstream_timeout, &hash_policies);
            routes.push(route);
        }

        let gateway = deployment.gateway();
        let vhost_name = gateway
            .virtual_host_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}-vhost", deployment.name, deployment.version));
        let domains = if gateway.domains.is_empty() {
            vec!["*".to_string()]
        } else {
            gateway.domains.clone()
        };
        let route_config_name = if gateway.dedicated_listener {
            format!("{}-{}-route", deployment.name, deployment.version)
        } else {
            SHARED_ROUTE_NAME.to_string()
        };

        Ok(build_route_configuration(
            &route_config_name,
            vec![build_virtual_host(&vhost_name, domains, routes)],
        ))
    }

    fn apply_retries(&self, route_config: &mut RouteConfiguration, deployment: &ApiDeployment) -> FlowcResult<()> {
        for vhost in &mut route_config.virtual_hosts {
            for route in &mut vhost.routes {
                self.retry.configure_retry(route, deployment)?;
            }
        }
        Ok(())
    }

    fn generate_listeners(&self, deployment: &ApiDeployment, route_config: &RouteConfiguration) -> Vec<Listener> {
        let gateway = deployment.gateway();
        if !gateway.dedicated_listener {
            return Vec::new();
        }
        let name = format!("{}-{}-listener", deployment.name, deployment.version);
        vec![build_listener(&name, &route_config.name, gateway.port)]
    }

    fn run(&self, deployment: &ApiDeployment, ir: &Api) -> FlowcResult<XdsResources> {
        // 1. clusters
        let mut clusters = self.generate_clusters(deployment)?;
        // 2. load balancing
        self.apply_load_balancing(&mut clusters, deployment)?;
        // 3. routes
        let mut route_config = self.generate_routes(deployment, ir)?;
        // 4. retries
        self.apply_retries(&mut route_config, deployment)?;
        // 5. listeners
        let mut listeners = self.generate_listeners(deployment, &route_config);
        // 6. rate limits
        if let Some(listener) = listeners.first_mut() {
            self.rate_limit.configure_rate_limit(listener, deployment)?;
        }
        // 7. observability
        if let Some(listener) = listeners.first_mut() {
            self.observability
                .configure_observability(listener, &mut clusters, deployment)?;
        }

        Ok(XdsResources {
            clusters,
            endpoints: Vec::new(),
            listeners,
            routes: vec![route_config],
        })
    }
}

impl Translator for CompositeTranslator {
    fn translate(&self, deployment: &ApiDeployment, ir: &Api, node_id: &NodeId) -> FlowcResult<XdsResources> {
        let span = info_span!(
            "translate",
            node = %node_id,
            deployment = %deployment.id,
            api = %deployment.name,
            version = %deployment.version,
            translator = %self.name(),
        );
        let _enter = span.enter();
        let started = Instant::now();

        self.validate(deployment, ir)?;
        let resources = self.run(deployment, ir)?;

        metrics::histogram!("flowc_translation_duration_seconds").record(started.elapsed().as_secs_f64());
        debug!(
            clusters = resources.clusters.len(),
            routes = resources.routes.iter().map(route_count).sum::<usize>(),
            listeners = resources.listeners.len(),
            "translation complete"
        );
        Ok(resources)
    }

    fn validate(&self, deployment: &ApiDeployment, ir: &Api) -> FlowcResult<()> {
        self.deployment.validate(deployment)?;
        ir.validate()
    }

    fn name(&self) -> String {
        format!(
            "composite[{}/{}/{}/{}/{}/{}]",
            self.deployment.name(),
            self.route_match.name(),
            self.load_balancing.name(),
            self.retry.name(),
            self.rate_limit.name(),
            self.observability.name(),
        )
    }
}

/// IR base path, else the deployment context, else `/`.
fn base_path(deployment: &ApiDeployment, ir: &Api) -> String {
    match ir.metadata.base_path.as_deref() {
        Some(path) if !path.trim().is_empty() => ir.metadata.base_path(),
        _ => flowc_model::ir::normalize_base_path(&deployment.context),
    }
}

/// Identity of a matcher: two routes with equal keys match the same requests.
fn match_key(m: &RouteMatch) -> Vec<u8> {
    let mut key = m.clone();
    if key.case_sensitive.as_ref().is_some_and(|c| !c.value) {
        if let Some(route_match::PathSpecifier::Prefix(p) | route_match::PathSpecifier::Path(p)) =
            key.path_specifier.as_mut()
        {
            *p = p.to_ascii_lowercase();
        }
    }
    key.encode_to_vec()
}

fn shape_action(
    route: &mut Route,
    endpoint: &Endpoint,
    upstream_timeout: Option<Duration>,
    hash_policies: &[route_action::HashPolicy],
) {
    let Some(route::Action::Route(action)) = route.action.as_mut() else {
        return;
    };
    let timeout = match (endpoint.timeout, endpoint.endpoint_type.is_streaming()) {
        (Some(t), _) => Some(t),
        (None, true) => Some(Duration::ZERO),
        (None, false) => upstream_timeout,
    };
    action.timeout = timeout.map(duration);
    action.hash_policy = hash_policies.to_vec();
    if endpoint.endpoint_type.is_websocket() {
        action.upgrade_configs = vec![route_action::UpgradeConfig {
            upgrade_type: WEBSOCKET_UPGRADE.to_string(),
            enabled: Some(bool_value(true)),
            ..Default::default()
        }];
    }
}

fn route_count(rc: &RouteConfiguration) -> usize {
    rc.virtual_hosts.iter().map(|vh| vh.routes.len()).sum()
}

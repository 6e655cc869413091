//! The six policy capabilities the composite translator is assembled from.
//!
//! Each trait covers one concern. The composite invokes them in fixed
//! phases and they never call each other, so any combination of variants
//! can be mixed in a [`StrategySet`].

use std::fmt;

use flowc_core::FlowcResult;
use flowc_model::{ApiDeployment, Endpoint};
use flowc_types::pb::envoy::config::cluster::v3::Cluster;
use flowc_types::pb::envoy::config::listener::v3::Listener;
use flowc_types::pb::envoy::config::route::v3::{route_action::HashPolicy, Route, RouteMatch};

use crate::builders::RouteTarget;

mod deployment;
mod load_balancing;
mod observability;
mod rate_limit;
mod retry;
mod route_match;

pub use deployment::{BasicDeployment, BlueGreenDeployment, CanaryDeployment};
pub use load_balancing::{
    ConsistentHashLoadBalancing, HashKey, LeastRequestLoadBalancing, LocalityAwareLoadBalancing,
    RandomLoadBalancing, RoundRobinLoadBalancing, DEFAULT_CHOICE_COUNT, MIN_RING_SIZE,
};
pub use observability::NoopObservability;
pub use rate_limit::NoopRateLimit;
pub use retry::{
    AggressiveRetry, ConservativeRetry, CustomRetry, NoRetry, BACKOFF_BASE_INTERVAL,
    BACKOFF_MAX_INTERVAL,
};
pub use route_match::{
    ExactRouteMatch, HeaderVersionedRouteMatch, PrefixRouteMatch, RegexRouteMatch,
    DEFAULT_VERSION_HEADER,
};

/// Shape of the clusters a deployment produces, and how routes reach them.
pub trait DeploymentStrategy: Send + Sync + fmt::Debug {
    /// Strategy identifier (`basic`, `canary`, `blue-green`).
    fn name(&self) -> &'static str;

    /// Check the deployment can be translated with this strategy.
    fn validate(&self, deployment: &ApiDeployment) -> FlowcResult<()>;

    /// Clusters for the deployment; the first is the primary.
    fn generate_clusters(&self, deployment: &ApiDeployment) -> FlowcResult<Vec<Cluster>>;

    /// Names of [`generate_clusters`](Self::generate_clusters), same order.
    fn cluster_names(&self, deployment: &ApiDeployment) -> Vec<String>;

    /// Where routes send traffic. Defaults to the primary cluster.
    fn route_target(&self, deployment: &ApiDeployment) -> RouteTarget {
        let primary = self
            .cluster_names(deployment)
            .into_iter()
            .next()
            .unwrap_or_default();
        RouteTarget::Cluster(primary)
    }
}

/// Turns a full path and method into a route match.
pub trait RouteMatchStrategy: Send + Sync + fmt::Debug {
    /// Strategy identifier.
    fn name(&self) -> &'static str;

    /// Match for `full_path`; always carries a `:method` exact matcher.
    fn create_matcher(&self, full_path: &str, method: &str, endpoint: &Endpoint) -> RouteMatch;
}

/// Configures the load-balancing policy of clusters.
pub trait LoadBalancingStrategy: Send + Sync + fmt::Debug {
    /// Strategy identifier.
    fn name(&self) -> &'static str;

    /// Apply the policy to `cluster`.
    fn configure_cluster(&self, cluster: &mut Cluster, deployment: &ApiDeployment) -> FlowcResult<()>;

    /// Hash policies routes must carry for the policy to take effect.
    fn route_hash_policies(&self) -> Vec<HashPolicy> {
        Vec::new()
    }
}

/// Attaches retry policies to routes.
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    /// Strategy identifier.
    fn name(&self) -> &'static str;

    /// Configure retries on `route`.
    fn configure_retry(&self, route: &mut Route, deployment: &ApiDeployment) -> FlowcResult<()>;
}

/// Applies rate limits to a listener.
pub trait RateLimitStrategy: Send + Sync + fmt::Debug {
    /// Strategy identifier.
    fn name(&self) -> &'static str;

    /// Configure rate limiting on `listener`.
    fn configure_rate_limit(&self, listener: &mut Listener, deployment: &ApiDeployment) -> FlowcResult<()>;
}

/// Adds tracing, metrics and access logging.
pub trait ObservabilityStrategy: Send + Sync + fmt::Debug {
    /// Strategy identifier.
    fn name(&self) -> &'static str;

    /// Configure observability on the primary listener and the clusters.
    fn configure_observability(
        &self,
        listener: &mut Listener,
        clusters: &mut [Cluster],
        deployment: &ApiDeployment,
    ) -> FlowcResult<()>;
}

/// One strategy per concern, owned for the duration of a translation.
///
/// `deployment` and `route_match` are required; the composite translator
/// rejects a set without them and fills the others with no-ops.
#[derive(Debug, Default)]
pub struct StrategySet {
    /// Cluster shape.
    pub deployment: Option<Box<dyn DeploymentStrategy>>,
    /// Path matching.
    pub route_match: Option<Box<dyn RouteMatchStrategy>>,
    /// Cluster load balancing.
    pub load_balancing: Option<Box<dyn LoadBalancingStrategy>>,
    /// Route retries.
    pub retry: Option<Box<dyn RetryStrategy>>,
    /// Listener rate limits.
    pub rate_limit: Option<Box<dyn RateLimitStrategy>>,
    /// Observability.
    pub observability: Option<Box<dyn ObservabilityStrategy>>,
}

impl StrategySet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deployment strategy.
    #[must_use]
    pub fn with_deployment(mut self, s: impl DeploymentStrategy + 'static) -> Self {
        self.deployment = Some(Box::new(s));
        self
    }

    /// Set the route-match strategy.
    #[must_use]
    pub fn with_route_match(mut self, s: impl RouteMatchStrategy + 'static) -> Self {
        self.route_match = Some(Box::new(s));
        self
    }

    /// Set the load-balancing strategy.
    #[must_use]
    pub fn with_load_balancing(mut self, s: impl LoadBalancingStrategy + 'static) -> Self {
        self.load_balancing = Some(Box::new(s));
        self
    }

    /// Set the retry strategy.
    #[must_use]
    pub fn with_retry(mut self, s: impl RetryStrategy + 'static) -> Self {
        self.retry = Some(Box::new(s));
        self
    }

    /// Set the rate-limit strategy.
    #[must_use]
    pub fn with_rate_limit(mut self, s: impl RateLimitStrategy + 'static) -> Self {
        self.rate_limit = Some(Box::new(s));
        self
    }

    /// Set the observability strategy.
    #[must_use]
    pub fn with_observability(mut self, s: impl ObservabilityStrategy + 'static) -> Self {
        self.observability = Some(Box::new(s));
        self
    }
}

//! Builds a [`StrategySet`] from resolved configuration.

use flowc_core::{FlowcError, FlowcResult};
use flowc_model::strategy::{
    DeploymentStrategyConfig, LoadBalancingConfig, RateLimitConfig, RetryConfig,
    RouteMatchingConfig,
};
use flowc_model::ApiDeployment;
use tracing::debug;

use crate::config::ResolvedStrategyConfig;
use crate::strategy::{
    AggressiveRetry, BasicDeployment, BlueGreenDeployment, CanaryDeployment, ConservativeRetry,
    ConsistentHashLoadBalancing, CustomRetry, DeploymentStrategy, ExactRouteMatch, HashKey,
    HeaderVersionedRouteMatch, LeastRequestLoadBalancing, LoadBalancingStrategy,
    LocalityAwareLoadBalancing, NoRetry, NoopObservability, NoopRateLimit, PrefixRouteMatch,
    RandomLoadBalancing, RateLimitStrategy, RegexRouteMatch, RetryStrategy,
    RoundRobinLoadBalancing, RouteMatchStrategy, StrategySet, DEFAULT_CHOICE_COUNT,
    DEFAULT_VERSION_HEADER,
};

/// Lowercase and accept `_` in place of `-`.
fn kind(strategy_type: &str) -> String {
    strategy_type.trim().to_ascii_lowercase().replace('_', "-")
}

fn unknown(slot: &str, strategy_type: &str) -> FlowcError {
    FlowcError::configuration(format!("unknown {slot} strategy type {strategy_type:?}"))
}

fn missing(block: &str, strategy_type: &str) -> FlowcError {
    FlowcError::configuration(format!(
        "{strategy_type} strategy requires the {block} block"
    ))
}

/// Maps resolved strategy configuration to strategy instances.
///
/// All configuration checks happen here, before any resource is built.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrategyFactory;

impl StrategyFactory {
    /// Create the factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Strategy set for `deployment` under `config`.
    pub fn create(&self, config: &ResolvedStrategyConfig, deployment: &ApiDeployment) -> FlowcResult<StrategySet> {
        let set = StrategySet {
            deployment: Some(self.deployment(&config.deployment)?),
            route_match: Some(self.route_match(&config.route_matching, deployment)?),
            load_balancing: Some(self.load_balancing(&config.load_balancing)?),
            retry: Some(self.retry(&config.retry)?),
            rate_limit: Some(self.rate_limit(&config.rate_limiting)?),
            observability: Some(Box::new(NoopObservability)),
        };
        debug!(
            deployment = %config.deployment.strategy_type,
            route_matching = %config.route_matching.strategy_type,
            load_balancing = %config.load_balancing.strategy_type,
            retry = %config.retry.strategy_type,
            "strategy set created"
        );
        Ok(set)
    }

    /// Deployment strategy for `cfg`.
    pub fn deployment(&self, cfg: &DeploymentStrategyConfig) -> FlowcResult<Box<dyn DeploymentStrategy>> {
        match kind(&cfg.strategy_type).as_str() {
            "basic" => Ok(Box::new(BasicDeployment::new())),
            "canary" => {
                let c = cfg
                    .canary
                    .as_ref()
                    .ok_or_else(|| missing("deployment.canary", "canary"))?;
                Ok(Box::new(CanaryDeployment::new(
                    &c.baseline_version,
                    &c.canary_version,
                    c.canary_weight,
                )?))
            }
            "blue-green" => {
                let bg = cfg
                    .blue_green
                    .as_ref()
                    .ok_or_else(|| missing("deployment.blue_green", "blue-green"))?;
                Ok(Box::new(BlueGreenDeployment::new(
                    &bg.active_version,
                    &bg.standby_version,
                    bg.auto_promote,
                )?))
            }
            _ => Err(unknown("deployment", &cfg.strategy_type)),
        }
    }

    /// Route-match strategy for `cfg`.
    pub fn route_match(
        &self,
        cfg: &RouteMatchingConfig,
        deployment: &ApiDeployment,
    ) -> FlowcResult<Box<dyn RouteMatchStrategy>> {
        match kind(&cfg.strategy_type).as_str() {
            "prefix" => Ok(Box::new(PrefixRouteMatch::new(cfg.case_sensitive))),
            "exact" => Ok(Box::new(ExactRouteMatch)),
            "regex" => Ok(Box::new(RegexRouteMatch)),
            "header-versioned" => {
                let header = cfg
                    .version_header
                    .clone()
                    .filter(|h| !h.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_VERSION_HEADER.to_string());
                Ok(Box::new(HeaderVersionedRouteMatch::new(
                    header,
                    deployment.version.clone(),
                    cfg.case_sensitive,
                )))
            }
            _ => Err(unknown("route_matching", &cfg.strategy_type)),
        }
    }

    /// Load-balancing strategy for `cfg`.
    pub fn load_balancing(&self, cfg: &LoadBalancingConfig) -> FlowcResult<Box<dyn LoadBalancingStrategy>> {
        match kind(&cfg.strategy_type).as_str() {
            "consistent-hash" => Ok(Box::new(ConsistentHashLoadBalancing::new(hash_key(cfg)?)?)),
            "locality-aware" => {
                let base_type = cfg.base_policy.as_deref().unwrap_or("round-robin");
                if kind(base_type) == "locality-aware" || kind(base_type) == "consistent-hash" {
                    return Err(FlowcError::configuration(format!(
                        "{base_type:?} cannot be the base policy of locality-aware"
                    )));
                }
                let base = self.simple_load_balancing(base_type, cfg.choice_count)?;
                Ok(Box::new(LocalityAwareLoadBalancing::new(base)))
            }
            _ => self.simple_load_balancing(&cfg.strategy_type, cfg.choice_count),
        }
    }

    fn simple_load_balancing(
        &self,
        strategy_type: &str,
        choice_count: Option<u32>,
    ) -> FlowcResult<Box<dyn LoadBalancingStrategy>> {
        match kind(strategy_type).as_str() {
            "round-robin" => Ok(Box::new(RoundRobinLoadBalancing)),
            "least-request" => Ok(Box::new(LeastRequestLoadBalancing::new(
                choice_count.unwrap_or(DEFAULT_CHOICE_COUNT),
            )?)),
            "random" => Ok(Box::new(RandomLoadBalancing)),
            _ => Err(unknown("load_balancing", strategy_type)),
        }
    }

    /// Retry strategy for `cfg`.
    pub fn retry(&self, cfg: &RetryConfig) -> FlowcResult<Box<dyn RetryStrategy>> {
        match kind(&cfg.strategy_type).as_str() {
            "none" => Ok(Box::new(NoRetry)),
            "conservative" => Ok(Box::new(ConservativeRetry)),
            "aggressive" => Ok(Box::new(AggressiveRetry)),
            "custom" => {
                let max_retries = cfg
                    .max_retries
                    .ok_or_else(|| missing("retry.max_retries", "custom retry"))?;
                Ok(Box::new(CustomRetry::new(
                    max_retries,
                    cfg.retry_on.clone().unwrap_or_else(|| "5xx".to_string()),
                    cfg.per_try_timeout,
                    cfg.retriable_status_codes.clone(),
                    cfg.budget_percent,
                )?))
            }
            _ => Err(unknown("retry", &cfg.strategy_type)),
        }
    }

    /// Rate-limit strategy for `cfg`.
    pub fn rate_limit(&self, cfg: &RateLimitConfig) -> FlowcResult<Box<dyn RateLimitStrategy>> {
        match kind(&cfg.strategy_type).as_str() {
            "none" | "" => Ok(Box::new(NoopRateLimit)),
            _ => Err(unknown("rate_limiting", &cfg.strategy_type)),
        }
    }
}

fn hash_key(cfg: &LoadBalancingConfig) -> FlowcResult<HashKey> {
    let hash_on = cfg.hash_on.as_deref().map(kind);
    match hash_on.as_deref() {
        None | Some("source-ip") => Ok(HashKey::SourceIp),
        Some("header") => cfg
            .header_name
            .clone()
            .map(HashKey::Header)
            .ok_or_else(|| missing("load_balancing.header_name", "consistent-hash on header")),
        Some("cookie") => cfg
            .cookie_name
            .clone()
            .map(HashKey::Cookie)
            .ok_or_else(|| missing("load_balancing.cookie_name", "consistent-hash on cookie")),
        Some(other) => Err(FlowcError::configuration(format!(
            "unknown load_balancing.hash_on {other:?}"
        ))),
    }
}

//! Three-level strategy configuration resolution.
//!
//! Built-in defaults, then gateway-wide defaults, then the per-API config.
//! Resolution is per slot: a slot present at a higher level replaces the
//! slot below it wholesale.

use std::time::Duration;

use flowc_model::strategy::{
    DeploymentStrategyConfig, LoadBalancingConfig, ObservabilityConfig, RateLimitConfig,
    RetryConfig, RouteMatchingConfig,
};
use flowc_model::StrategyConfig;

use crate::strategy::DEFAULT_CHOICE_COUNT;

/// Strategy configuration with every slot filled.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStrategyConfig {
    /// Cluster shape.
    pub deployment: DeploymentStrategyConfig,
    /// Path matching.
    pub route_matching: RouteMatchingConfig,
    /// Load balancing.
    pub load_balancing: LoadBalancingConfig,
    /// Retries.
    pub retry: RetryConfig,
    /// Rate limiting.
    pub rate_limiting: RateLimitConfig,
    /// Observability.
    pub observability: ObservabilityConfig,
}

impl Default for ResolvedStrategyConfig {
    fn default() -> Self {
        builtin_defaults()
    }
}

/// Defaults used when neither the gateway nor the API sets a slot.
#[must_use]
pub fn builtin_defaults() -> ResolvedStrategyConfig {
    ResolvedStrategyConfig {
        deployment: DeploymentStrategyConfig {
            strategy_type: "basic".into(),
            ..Default::default()
        },
        route_matching: RouteMatchingConfig {
            strategy_type: "prefix".into(),
            case_sensitive: true,
            version_header: None,
        },
        load_balancing: LoadBalancingConfig {
            strategy_type: "round-robin".into(),
            choice_count: Some(DEFAULT_CHOICE_COUNT),
            ..Default::default()
        },
        retry: RetryConfig {
            strategy_type: "conservative".into(),
            max_retries: Some(1),
            retry_on: Some("5xx,reset".into()),
            per_try_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        },
        rate_limiting: RateLimitConfig {
            strategy_type: "none".into(),
            ..Default::default()
        },
        observability: ObservabilityConfig::default(),
    }
}

/// Resolves the effective strategy configuration of a deployment.
#[derive(Clone, Debug, Default)]
pub struct ConfigResolver {
    gateway: StrategyConfig,
}

impl ConfigResolver {
    /// Resolver with built-in defaults only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with gateway-wide defaults layered over the built-ins.
    #[must_use]
    pub fn with_gateway_defaults(gateway: StrategyConfig) -> Self {
        Self { gateway }
    }

    /// Gateway-wide defaults.
    #[must_use]
    pub fn gateway_defaults(&self) -> &StrategyConfig {
        &self.gateway
    }

    /// Effective config for an API carrying `api` (if any).
    #[must_use]
    pub fn resolve(&self, api: Option<&StrategyConfig>) -> ResolvedStrategyConfig {
        let builtin = builtin_defaults();
        let empty = StrategyConfig::default();
        let api = api.unwrap_or(&empty);
        let gateway = &self.gateway;

        fn pick<T: Clone>(api: &Option<T>, gateway: &Option<T>, builtin: T) -> T {
            api.clone().or_else(|| gateway.clone()).unwrap_or(builtin)
        }

        ResolvedStrategyConfig {
            deployment: pick(&api.deployment, &gateway.deployment, builtin.deployment),
            route_matching: pick(&api.route_matching, &gateway.route_matching, builtin.route_matching),
            load_balancing: pick(&api.load_balancing, &gateway.load_balancing, builtin.load_balancing),
            retry: pick(&api.retry, &gateway.retry, builtin.retry),
            rate_limiting: pick(&api.rate_limiting, &gateway.rate_limiting, builtin.rate_limiting),
            observability: pick(&api.observability, &gateway.observability, builtin.observability),
        }
    }
}

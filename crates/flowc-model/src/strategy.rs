//! Strategy configuration.
//!
//! Every slot is optional. Resolution happens in the translator: a slot set
//! at a more specific level replaces the whole slot from the level below,
//! fields inside a slot are never merged.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-deployment (or gateway-wide) strategy configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Cluster shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentStrategyConfig>,
    /// Path matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_matching: Option<RouteMatchingConfig>,
    /// Load balancing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancing: Option<LoadBalancingConfig>,
    /// Retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Rate limiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limiting: Option<RateLimitConfig>,
    /// Tracing, metrics and access logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

/// `deployment.*`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStrategyConfig {
    /// `basic`, `canary` or `blue-green`.
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Required for `canary`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canary: Option<CanaryConfig>,
    /// Required for `blue-green`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blue_green: Option<BlueGreenConfig>,
}

/// `deployment.canary.*`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanaryConfig {
    /// Version receiving `100 - canary_weight` percent.
    pub baseline_version: String,
    /// Version receiving `canary_weight` percent.
    pub canary_version: String,
    /// Percentage in `[0, 100]`.
    pub canary_weight: u32,
}

/// `deployment.blue_green.*`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueGreenConfig {
    /// Version receiving all traffic.
    pub active_version: String,
    /// Version kept warm.
    pub standby_version: String,
    /// Promote standby automatically. Recorded only.
    #[serde(default)]
    pub auto_promote: bool,
}

/// `route_matching.*`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatchingConfig {
    /// `prefix`, `exact`, `regex` or `header-versioned`.
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Case-sensitive path matching.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// Header carrying the API version, for `header-versioned`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_header: Option<String>,
}

impl Default for RouteMatchingConfig {
    fn default() -> Self {
        Self {
            strategy_type: String::new(),
            case_sensitive: true,
            version_header: None,
        }
    }
}

/// `load_balancing.*`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancingConfig {
    /// `round-robin`, `least-request`, `random`, `consistent-hash` or
    /// `locality-aware`.
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Hash key source for `consistent-hash`: `header`, `cookie` or `source-ip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_on: Option<String>,
    /// Header hashed when `hash_on = header`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    /// Cookie hashed when `hash_on = cookie`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
    /// Choice count for `least-request`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_count: Option<u32>,
    /// Base policy for `locality-aware`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_policy: Option<String>,
}

/// `retry.*`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// `none`, `conservative`, `aggressive` or `custom`.
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Retry count for `custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Envoy `retry_on` conditions for `custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on: Option<String>,
    /// Per-attempt timeout for `custom`.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub per_try_timeout: Option<Duration>,
    /// Status codes retried under `retriable-status-codes`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retriable_status_codes: Vec<u32>,
    /// Enables exponential backoff when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_percent: Option<f64>,
}

/// `rate_limiting.*`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Only `none` is built in.
    #[serde(rename = "type")]
    pub strategy_type: String,
    /// Requests allowed per unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_unit: Option<u32>,
    /// `second`, `minute`, `hour`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// `observability.*`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Distributed tracing.
    #[serde(default)]
    pub tracing: TracingConfig,
    /// Per-route metrics.
    #[serde(default)]
    pub metrics: ToggleConfig,
    /// Access logging.
    #[serde(default)]
    pub access_logs: ToggleConfig,
}

/// `observability.tracing.*`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracingConfig {
    /// Whether tracing is on.
    #[serde(default)]
    pub enabled: bool,
    /// Fraction of requests sampled.
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sampling_rate: default_sampling_rate(),
        }
    }
}

/// An on/off switch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleConfig {
    /// Whether the feature is on.
    #[serde(default)]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_sampling_rate() -> f64 {
    0.01
}

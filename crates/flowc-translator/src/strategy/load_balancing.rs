use flowc_core::{FlowcError, FlowcResult};
use flowc_model::ApiDeployment;
use flowc_types::pb::envoy::config::cluster::v3::{cluster, Cluster};
use flowc_types::pb::envoy::config::route::v3::route_action::{hash_policy, HashPolicy};
use flowc_types::{u32_value, u64_value};

use super::LoadBalancingStrategy;

/// Default `choice_count` for least-request.
pub const DEFAULT_CHOICE_COUNT: u32 = 2;

/// Minimum ring size for consistent hashing.
pub const MIN_RING_SIZE: u64 = 1024;

fn set_policy(cluster: &mut Cluster, policy: cluster::LbPolicy) {
    cluster.lb_policy = policy as i32;
    cluster.lb_config = None;
}

/// Round-robin.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinLoadBalancing;

impl LoadBalancingStrategy for RoundRobinLoadBalancing {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn configure_cluster(&self, cluster: &mut Cluster, _deployment: &ApiDeployment) -> FlowcResult<()> {
        set_policy(cluster, cluster::LbPolicy::RoundRobin);
        Ok(())
    }
}

/// Least-request with power-of-N choices.
#[derive(Clone, Debug)]
pub struct LeastRequestLoadBalancing {
    choice_count: u32,
}

impl LeastRequestLoadBalancing {
    /// Create the strategy; `choice_count` must be at least 2.
    pub fn new(choice_count: u32) -> FlowcResult<Self> {
        if choice_count < 2 {
            return Err(FlowcError::validation(
                "load_balancing.choice_count",
                format!("must be at least 2, got {choice_count}"),
            ));
        }
        Ok(Self { choice_count })
    }
}

impl Default for LeastRequestLoadBalancing {
    fn default() -> Self {
        Self {
            choice_count: DEFAULT_CHOICE_COUNT,
        }
    }
}

impl LoadBalancingStrategy for LeastRequestLoadBalancing {
    fn name(&self) -> &'static str {
        "least-request"
    }

    fn configure_cluster(&self, cluster: &mut Cluster, _deployment: &ApiDeployment) -> FlowcResult<()> {
        set_policy(cluster, cluster::LbPolicy::LeastRequest);
        cluster.lb_config = Some(cluster::LbConfig::LeastRequestLbConfig(
            cluster::LeastRequestLbConfig {
                choice_count: Some(u32_value(self.choice_count)),
                ..Default::default()
            },
        ));
        Ok(())
    }
}

/// Uniform random.
#[derive(Clone, Debug, Default)]
pub struct RandomLoadBalancing;

impl LoadBalancingStrategy for RandomLoadBalancing {
    fn name(&self) -> &'static str {
        "random"
    }

    fn configure_cluster(&self, cluster: &mut Cluster, _deployment: &ApiDeployment) -> FlowcResult<()> {
        set_policy(cluster, cluster::LbPolicy::Random);
        Ok(())
    }
}

/// What consistent hashing keys on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashKey {
    /// A request header.
    Header(String),
    /// A cookie.
    Cookie(String),
    /// The downstream source address.
    SourceIp,
}

/// Ring-hash with xxHash.
#[derive(Clone, Debug)]
pub struct ConsistentHashLoadBalancing {
    key: HashKey,
}

impl ConsistentHashLoadBalancing {
    /// Create the strategy.
    pub fn new(key: HashKey) -> FlowcResult<Self> {
        match &key {
            HashKey::Header(name) if name.trim().is_empty() => {
                return Err(FlowcError::validation("load_balancing.header_name", "must not be empty"));
            }
            HashKey::Cookie(name) if name.trim().is_empty() => {
                return Err(FlowcError::validation("load_balancing.cookie_name", "must not be empty"));
            }
            _ => {}
        }
        Ok(Self { key })
    }

    /// Hash key source.
    #[must_use]
    pub fn key(&self) -> &HashKey {
        &self.key
    }
}

impl LoadBalancingStrategy for ConsistentHashLoadBalancing {
    fn name(&self) -> &'static str {
        "consistent-hash"
    }

    fn configure_cluster(&self, cluster: &mut Cluster, _deployment: &ApiDeployment) -> FlowcResult<()> {
        set_policy(cluster, cluster::LbPolicy::RingHash);
        cluster.lb_config = Some(cluster::LbConfig::RingHashLbConfig(cluster::RingHashLbConfig {
            minimum_ring_size: Some(u64_value(MIN_RING_SIZE)),
            hash_function: cluster::ring_hash_lb_config::HashFunction::XxHash as i32,
            ..Default::default()
        }));
        Ok(())
    }

    fn route_hash_policies(&self) -> Vec<HashPolicy> {
        let specifier = match &self.key {
            HashKey::Header(name) => hash_policy::PolicySpecifier::Header(hash_policy::Header {
                header_name: name.clone(),
                ..Default::default()
            }),
            HashKey::Cookie(name) => hash_policy::PolicySpecifier::Cookie(hash_policy::Cookie {
                name: name.clone(),
                ..Default::default()
            }),
            HashKey::SourceIp => {
                hash_policy::PolicySpecifier::ConnectionProperties(hash_policy::ConnectionProperties {
                    source_ip: true,
                })
            }
        };
        vec![HashPolicy {
            policy_specifier: Some(specifier),
            ..Default::default()
        }]
    }
}

/// A base policy plus locality-weighted balancing.
#[derive(Debug)]
pub struct LocalityAwareLoadBalancing {
    base: Box<dyn LoadBalancingStrategy>,
}

impl LocalityAwareLoadBalancing {
    /// Wrap `base`.
    #[must_use]
    pub fn new(base: Box<dyn LoadBalancingStrategy>) -> Self {
        Self { base }
    }
}

impl Default for LocalityAwareLoadBalancing {
    fn default() -> Self {
        Self::new(Box::new(RoundRobinLoadBalancing))
    }
}

impl LoadBalancingStrategy for LocalityAwareLoadBalancing {
    fn name(&self) -> &'static str {
        "locality-aware"
    }

    fn configure_cluster(&self, cluster: &mut Cluster, deployment: &ApiDeployment) -> FlowcResult<()> {
        self.base.configure_cluster(cluster, deployment)?;
        cluster
            .common_lb_config
            .get_or_insert_with(Default::default)
            .locality_config_specifier = Some(
            cluster::common_lb_config::LocalityConfigSpecifier::LocalityWeightedLbConfig(
                cluster::common_lb_config::LocalityWeightedLbConfig {},
            ),
        );
        Ok(())
    }

    fn route_hash_policies(&self) -> Vec<HashPolicy> {
        self.base.route_hash_policies()
    }
}

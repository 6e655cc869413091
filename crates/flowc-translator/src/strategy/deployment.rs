use flowc_core::{FlowcError, FlowcResult};
use flowc_model::ApiDeployment;
use flowc_types::pb::envoy::config::cluster::v3::Cluster;

use super::DeploymentStrategy;
use crate::builders::{build_cluster, RouteTarget};

fn require(field: &str, value: &str) -> FlowcResult<()> {
    if value.trim().is_empty() {
        return Err(FlowcError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_upstream(deployment: &ApiDeployment) -> FlowcResult<()> {
    require("name", &deployment.name)?;
    require("version", &deployment.version)?;
    let upstream = deployment.upstream();
    require("upstream.host", &upstream.host)?;
    if upstream.port == 0 {
        return Err(FlowcError::validation("upstream.port", "must not be zero"));
    }
    Ok(())
}

fn upstream_cluster(deployment: &ApiDeployment, name: &str) -> Cluster {
    let upstream = deployment.upstream();
    build_cluster(name, &upstream.host, upstream.port, upstream.scheme)
}

/// One cluster, `{name}-{version}-cluster`.
#[derive(Clone, Debug, Default)]
pub struct BasicDeployment;

impl BasicDeployment {
    /// Create the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DeploymentStrategy for BasicDeployment {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn validate(&self, deployment: &ApiDeployment) -> FlowcResult<()> {
        validate_upstream(deployment)
    }

    fn generate_clusters(&self, deployment: &ApiDeployment) -> FlowcResult<Vec<Cluster>> {
        self.validate(deployment)?;
        Ok(self
            .cluster_names(deployment)
            .iter()
            .map(|name| upstream_cluster(deployment, name))
            .collect())
    }

    fn cluster_names(&self, deployment: &ApiDeployment) -> Vec<String> {
        vec![format!("{}-{}-cluster", deployment.name, deployment.version)]
    }
}

/// Baseline and canary clusters with a weighted traffic split.
#[derive(Clone, Debug)]
pub struct CanaryDeployment {
    baseline_version: String,
    canary_version: String,
    canary_weight: u32,
}

impl CanaryDeployment {
    /// Create the strategy; `canary_weight` must be within `[0, 100]`.
    pub fn new(
        baseline_version: impl Into<String>,
        canary_version: impl Into<String>,
        canary_weight: u32,
    ) -> FlowcResult<Self> {
        let strategy = Self {
            baseline_version: baseline_version.into(),
            canary_version: canary_version.into(),
            canary_weight,
        };
        strategy.check_config()?;
        Ok(strategy)
    }

    /// Percentage of traffic sent to the canary.
    #[must_use]
    pub fn canary_weight(&self) -> u32 {
        self.canary_weight
    }

    fn check_config(&self) -> FlowcResult<()> {
        if self.canary_weight > 100 {
            return Err(FlowcError::validation(
                "deployment.canary.canary_weight",
                format!("must be within [0, 100], got {}", self.canary_weight),
            ));
        }
        require("deployment.canary.baseline_version", &self.baseline_version)?;
        require("deployment.canary.canary_version", &self.canary_version)?;
        if self.baseline_version == self.canary_version {
            return Err(FlowcError::validation(
                "deployment.canary.canary_version",
                "must differ from baseline_version",
            ));
        }
        Ok(())
    }
}

impl DeploymentStrategy for CanaryDeployment {
    fn name(&self) -> &'static str {
        "canary"
    }

    fn validate(&self, deployment: &ApiDeployment) -> FlowcResult<()> {
        self.check_config()?;
        validate_upstream(deployment)
    }

    fn generate_clusters(&self, deployment: &ApiDeployment) -> FlowcResult<Vec<Cluster>> {
        self.validate(deployment)?;
        Ok(self
            .cluster_names(deployment)
            .iter()
            .map(|name| upstream_cluster(deployment, name))
            .collect())
    }

    fn cluster_names(&self, deployment: &ApiDeployment) -> Vec<String> {
        vec![
            format!("{}-{}-cluster", deployment.name, self.baseline_version),
            format!("{}-{}-cluster", deployment.name, self.canary_version),
        ]
    }

    fn route_target(&self, deployment: &ApiDeployment) -> RouteTarget {
        let mut names = self.cluster_names(deployment).into_iter();
        let baseline = names.next().unwrap_or_default();
        let canary = names.next().unwrap_or_default();
        // Degenerate splits route to a single cluster.
        match self.canary_weight {
            0 => RouteTarget::Cluster(baseline),
            100 => RouteTarget::Cluster(canary),
            w => RouteTarget::Weighted(vec![(baseline, 100 - w), (canary, w)]),
        }
    }
}

/// Active and standby clusters; all traffic goes to the active one.
#[derive(Clone, Debug)]
pub struct BlueGreenDeployment {
    active_version: String,
    standby_version: String,
    auto_promote: bool,
}

impl BlueGreenDeployment {
    /// Create the strategy.
    pub fn new(
        active_version: impl Into<String>,
        standby_version: impl Into<String>,
        auto_promote: bool,
    ) -> FlowcResult<Self> {
        let strategy = Self {
            active_version: active_version.into(),
            standby_version: standby_version.into(),
            auto_promote,
        };
        strategy.check_config()?;
        Ok(strategy)
    }

    /// Whether standby should be promoted without operator action.
    #[must_use]
    pub fn auto_promote(&self) -> bool {
        self.auto_promote
    }

    fn check_config(&self) -> FlowcResult<()> {
        require("deployment.blue_green.active_version", &self.active_version)?;
        require("deployment.blue_green.standby_version", &self.standby_version)
    }
}

impl DeploymentStrategy for BlueGreenDeployment {
    fn name(&self) -> &'static str {
        "blue-green"
    }

    fn validate(&self, deployment: &ApiDeployment) -> FlowcResult<()> {
        self.check_config()?;
        validate_upstream(deployment)
    }

    fn generate_clusters(&self, deployment: &ApiDeployment) -> FlowcResult<Vec<Cluster>> {
        self.validate(deployment)?;
        Ok(self
            .cluster_names(deployment)
            .iter()
            .map(|name| upstream_cluster(deployment, name))
            .collect())
    }

    fn cluster_names(&self, deployment: &ApiDeployment) -> Vec<String> {
        vec![
            format!("{}-{}-active-cluster", deployment.name, self.active_version),
            format!("{}-{}-standby-cluster", deployment.name, self.standby_version),
        ]
    }
}

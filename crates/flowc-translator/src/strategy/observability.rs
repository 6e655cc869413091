use flowc_core::FlowcResult;
use flowc_model::ApiDeployment;
use flowc_types::pb::envoy::config::cluster::v3::Cluster;
use flowc_types::pb::envoy::config::listener::v3::Listener;

use super::ObservabilityStrategy;

/// Accepts listeners and clusters unchanged.
#[derive(Clone, Debug, Default)]
pub struct NoopObservability;

impl ObservabilityStrategy for NoopObservability {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn configure_observability(
        &self,
        _listener: &mut Listener,
        _clusters: &mut [Cluster],
        _deployment: &ApiDeployment,
    ) -> FlowcResult<()> {
        Ok(())
    }
}

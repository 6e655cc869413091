use flowc_core::FlowcResult;
use flowc_model::ApiDeployment;
use flowc_types::pb::envoy::config::listener::v3::Listener;

use super::RateLimitStrategy;

/// Accepts every listener unchanged.
#[derive(Clone, Debug, Default)]
pub struct NoopRateLimit;

impl RateLimitStrategy for NoopRateLimit {
    fn name(&self) -> &'static str {
        "none"
    }

    fn configure_rate_limit(&self, _listener: &mut Listener, _deployment: &ApiDeployment) -> FlowcResult<()> {
        Ok(())
    }
}

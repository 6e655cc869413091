//! gRPC health checking (`grpc.health.v1.Health`).
//!
//! The ADS service is reported SERVING while the server runs and
//! NOT_SERVING once shutdown begins.

use std::sync::Arc;

use tokio::sync::Mutex;
use tonic_health::pb::health_server::{Health, HealthServer};
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;

/// Fully-qualified name of the ADS service.
pub const ADS_SERVICE_NAME: &str = "envoy.service.discovery.v3.AggregatedDiscoveryService";

/// Handle for updating health status.
#[derive(Clone)]
pub struct HealthService {
    reporter: Arc<Mutex<HealthReporter>>,
}

impl std::fmt::Debug for HealthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthService").finish()
    }
}

impl HealthService {
    /// Create the handle together with the tonic service to register.
    pub fn new() -> (Self, HealthServer<impl Health>) {
        let (reporter, service) = tonic_health::server::health_reporter();
        let handle = Self {
            reporter: Arc::new(Mutex::new(reporter)),
        };
        (handle, service)
    }

    /// Report the server and the ADS service as serving.
    pub async fn set_serving(&self) {
        self.set_status(ServingStatus::Serving).await;
    }

    /// Report the server and the ADS service as not serving.
    pub async fn set_not_serving(&self) {
        self.set_status(ServingStatus::NotServing).await;
    }

    async fn set_status(&self, status: ServingStatus) {
        let mut reporter = self.reporter.lock().await;
        // The empty name is the overall server status.
        reporter.set_service_status("", status).await;
        reporter.set_service_status(ADS_SERVICE_NAME, status).await;
    }
}

//! # flowc-server
//!
//! Aggregated Discovery Service server for the flowc control plane.
//!
//! - [`FlowcServer`] serves ADS (state-of-the-world) over gRPC from a
//!   [`ShardedCache`]
//! - [`FlowcServerBuilder`] configures it
//! - gRPC health checking via `grpc.health.v1.Health`
//! - graceful shutdown that ends every open stream with `UNAVAILABLE`
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowc_cache::ShardedCache;
//! use flowc_server::FlowcServer;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ShardedCache::new());
//! let server = FlowcServer::builder()
//!     .cache(cache)
//!     .listen_addr("0.0.0.0:18000".parse()?)
//!     .build()?;
//!
//! // Stops on SIGTERM or SIGINT.
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ads;
mod builder;
mod config;
pub mod health;
pub mod metrics;
pub mod shutdown;
mod sotw;
mod stream;
mod utils;

pub use ads::{AdsResponseStream, AdsService};
pub use builder::FlowcServerBuilder;
pub use config::ServerConfig;
pub use health::HealthService;
pub use metrics::AdsMetrics;
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use sotw::{SotwState, CONTROL_PLANE_ID};
pub use stream::{StreamContext, StreamId, StreamPhase};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use flowc_cache::ShardedCache;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tracing::info;

/// The ADS gRPC server.
#[derive(Debug)]
pub struct FlowcServer {
    cache: Arc<ShardedCache>,
    config: ServerConfig,
    shutdown: ShutdownController,
}

impl FlowcServer {
    /// Start configuring a server.
    pub fn builder() -> FlowcServerBuilder {
        FlowcServerBuilder::new()
    }

    /// Cache the server reads from.
    #[inline]
    pub fn cache(&self) -> &Arc<ShardedCache> {
        &self.cache
    }

    /// Server configuration.
    #[inline]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Controller shared with every stream.
    #[inline]
    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    async fn build_router(&self) -> (Router, Option<HealthService>) {
        let ads = AdsService::new(Arc::clone(&self.cache), self.shutdown.clone())
            .with_response_buffer(self.config.response_buffer);

        let (health, health_svc) = if self.config.enable_health {
            let (health, svc) = HealthService::new();
            health.set_serving().await;
            (Some(health), Some(svc))
        } else {
            (None, None)
        };

        let router = Server::builder()
            .http2_keepalive_interval(Some(self.config.keepalive_interval))
            .http2_keepalive_timeout(Some(self.config.keepalive_timeout))
            .max_concurrent_streams(Some(self.config.max_concurrent_streams))
            .add_optional_service(health_svc)
            .add_service(ads.into_server());

        (router, health)
    }

    fn drain<F>(&self, signal: F, health: Option<HealthService>) -> impl Future<Output = ()>
    where
        F: Future<Output = ()>,
    {
        let controller = self.shutdown.clone();
        let grace: Duration = self.config.shutdown_grace_period;
        async move {
            signal.await;
            if let Some(health) = health {
                health.set_not_serving().await;
            }
            info!(grace_period = ?grace, "draining ADS streams");
            controller.shutdown(grace).await;
        }
    }

    /// Serve on the configured address until SIGTERM or SIGINT.
    pub async fn serve(self) -> Result<(), tonic::transport::Error> {
        self.serve_with_shutdown(shutdown::wait_for_signal()).await
    }

    /// Serve on the configured address until `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        let addr = self.config.listen_addr;
        let (router, health) = self.build_router().await;
        info!(addr = %addr, "flowc ADS server listening");
        router
            .serve_with_shutdown(addr, self.drain(signal, health))
            .await
    }

    /// Serve connections from an already bound listener until `signal`
    /// resolves.
    pub async fn serve_with_incoming_shutdown<F>(
        self,
        incoming: TcpListenerStream,
        signal: F,
    ) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        let (router, health) = self.build_router().await;
        info!("flowc ADS server accepting connections");
        router
            .serve_with_incoming_shutdown(incoming, self.drain(signal, health))
            .await
    }
}

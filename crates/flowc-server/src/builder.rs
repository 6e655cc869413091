//! Builder for [`FlowcServer`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flowc_cache::ShardedCache;
use flowc_core::{FlowcError, FlowcResult};

use crate::config::ServerConfig;
use crate::shutdown::ShutdownController;
use crate::FlowcServer;

/// Builder for a [`FlowcServer`].
///
/// ```rust
/// use std::sync::Arc;
/// use flowc_cache::ShardedCache;
/// use flowc_server::FlowcServerBuilder;
///
/// let server = FlowcServerBuilder::new()
///     .cache(Arc::new(ShardedCache::new()))
///     .listen_addr("127.0.0.1:18000".parse().unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(server.config().listen_addr.port(), 18000);
/// ```
#[derive(Debug, Default)]
pub struct FlowcServerBuilder {
    cache: Option<Arc<ShardedCache>>,
    config: ServerConfig,
}

impl FlowcServerBuilder {
    /// Builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the server reads snapshots from. Required.
    pub fn cache(mut self, cache: Arc<ShardedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind address.
    pub fn listen_addr(mut self, addr: SocketAddr) -> Self {
        self.config.listen_addr = addr;
        self
    }

    /// HTTP/2 keepalive interval.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    /// HTTP/2 keepalive timeout.
    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keepalive_timeout = timeout;
        self
    }

    /// Concurrent HTTP/2 streams per connection.
    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.config.max_concurrent_streams = max;
        self
    }

    /// Responses buffered per ADS stream.
    pub fn response_buffer(mut self, size: usize) -> Self {
        self.config.response_buffer = size;
        self
    }

    /// Time shutdown waits for streams to drain.
    pub fn shutdown_grace_period(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace_period = grace;
        self
    }

    /// Skip the gRPC health service.
    pub fn disable_health(mut self) -> Self {
        self.config.enable_health = false;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Fails when no cache was given or the configuration is unusable.
    pub fn build(self) -> FlowcResult<FlowcServer> {
        let cache = self
            .cache
            .ok_or_else(|| FlowcError::configuration("cache is required"))?;
        self.config.validate()?;

        Ok(FlowcServer {
            cache,
            config: self.config,
            shutdown: ShutdownController::new(),
        })
    }
}

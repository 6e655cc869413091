//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use flowc_core::{FlowcError, FlowcResult};
use serde::Deserialize;

/// Configuration for the ADS server.
///
/// Deserializes from YAML or JSON with human-readable durations:
///
/// ```rust
/// use flowc_server::ServerConfig;
///
/// let config: ServerConfig = serde_json::from_str(
///     r#"{ "listen_addr": "127.0.0.1:18001", "keepalive_interval": "20s" }"#,
/// ).unwrap();
/// assert_eq!(config.keepalive_interval.as_secs(), 20);
/// assert_eq!(config.max_concurrent_streams, 100);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the gRPC server binds.
    pub listen_addr: SocketAddr,
    /// HTTP/2 keepalive ping interval.
    #[serde(with = "humantime_serde")]
    pub keepalive_interval: Duration,
    /// Time to wait for a keepalive ack before closing the connection.
    #[serde(with = "humantime_serde")]
    pub keepalive_timeout: Duration,
    /// HTTP/2 concurrent streams per connection.
    pub max_concurrent_streams: u32,
    /// Responses buffered per ADS stream before backpressure applies.
    pub response_buffer: usize,
    /// How long shutdown waits for open streams to drain.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
    /// Register the gRPC health service.
    pub enable_health: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 18000)),
            keepalive_interval: Duration::from_secs(30),
            keepalive_timeout: Duration::from_secs(5),
            max_concurrent_streams: 100,
            response_buffer: 16,
            shutdown_grace_period: Duration::from_secs(10),
            enable_health: true,
        }
    }
}

impl ServerConfig {
    /// Reject unusable settings.
    pub fn validate(&self) -> FlowcResult<()> {
        if self.max_concurrent_streams == 0 {
            return Err(FlowcError::configuration("max_concurrent_streams must be positive"));
        }
        if self.response_buffer == 0 {
            return Err(FlowcError::configuration("response_buffer must be positive"));
        }
        if self.keepalive_interval.is_zero() {
            return Err(FlowcError::configuration("keepalive_interval must be positive"));
        }
        if self.keepalive_timeout >= self.keepalive_interval {
            return Err(FlowcError::configuration(format!(
                "keepalive_timeout ({:?}) must be shorter than keepalive_interval ({:?})",
                self.keepalive_timeout, self.keepalive_interval
            )));
        }
        Ok(())
    }
}

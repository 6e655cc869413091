//! Deployment records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::StrategyConfig;

/// Default listener port of the shared per-node listener.
pub const DEFAULT_LISTENER_PORT: u16 = 10000;

/// Upstream protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamScheme {
    /// Plain HTTP/1.1.
    #[default]
    Http,
    /// HTTP over TLS; the cluster gets an upstream TLS socket.
    Https,
    /// Cleartext HTTP/2.
    Http2,
}

/// Where traffic for the API is sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Hostname or IP.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Protocol.
    #[serde(default)]
    pub scheme: UpstreamScheme,
    /// Request timeout used for routes without their own.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Which proxy serves the API, and how.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTarget {
    /// Target node.
    pub node_id: String,
    /// Listener port.
    #[serde(default = "default_listener_port")]
    pub port: u16,
    /// Environment label (`staging`, `prod`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Virtual-host domains; `["*"]` when empty.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Virtual-host name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_host_name: Option<String>,
    /// Emit a listener owned by this deployment instead of joining the
    /// shared default listener.
    #[serde(default)]
    pub dedicated_listener: bool,
}

impl Default for GatewayTarget {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            port: DEFAULT_LISTENER_PORT,
            environment: None,
            domains: Vec::new(),
            virtual_host_name: None,
            dedicated_listener: false,
        }
    }
}

fn default_listener_port() -> u16 {
    DEFAULT_LISTENER_PORT
}

/// Deployment descriptor shipped with an API bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowcMetadata {
    /// API name.
    pub name: String,
    /// API version.
    pub version: String,
    /// Context path used when the IR has no base path.
    #[serde(default)]
    pub context: String,
    /// Upstream service.
    pub upstream: UpstreamConfig,
    /// Gateway targeting.
    #[serde(default)]
    pub gateway: GatewayTarget,
    /// Per-API strategy configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyConfig>,
}

/// Lifecycle state of a deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Accepted, not yet published.
    #[default]
    Pending,
    /// Published in the node's snapshot.
    Deployed,
    /// Translation or publication failed.
    Failed,
    /// Removed from the node.
    Undeployed,
}

/// One API bound to one proxy node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiDeployment {
    /// Deployment id.
    pub id: String,
    /// API name.
    pub name: String,
    /// API version.
    pub version: String,
    /// Context path.
    pub context: String,
    /// Target node.
    pub node_id: String,
    /// Lifecycle state.
    pub status: DeploymentStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Descriptor the deployment was created from.
    pub flowc_metadata: FlowcMetadata,
}

impl ApiDeployment {
    /// New pending deployment with a random id.
    #[must_use]
    pub fn new(metadata: FlowcMetadata) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), metadata)
    }

    /// New pending deployment with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, metadata: FlowcMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            context: metadata.context.clone(),
            node_id: metadata.gateway.node_id.clone(),
            status: DeploymentStatus::Pending,
            created_at: now,
            updated_at: now,
            flowc_metadata: metadata,
        }
    }

    /// Move to `status` and bump `updated_at`.
    pub fn set_status(&mut self, status: DeploymentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Upstream of the deployment.
    #[must_use]
    pub fn upstream(&self) -> &UpstreamConfig {
        &self.flowc_metadata.upstream
    }

    /// Gateway targeting of the deployment.
    #[must_use]
    pub fn gateway(&self) -> &GatewayTarget {
        &self.flowc_metadata.gateway
    }

    /// Per-API strategy config, if any.
    #[must_use]
    pub fn strategy(&self) -> Option<&StrategyConfig> {
        self.flowc_metadata.strategy.as_ref()
    }
}

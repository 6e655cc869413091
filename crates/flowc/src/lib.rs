//! # flowc
//!
//! An xDS control plane that turns API descriptions into Envoy configuration.
//!
//! A deployment binds one API to one proxy node. [`ControlPlane::deploy`]
//! resolves its strategy configuration, translates the API into clusters,
//! endpoints, routes and listeners, and publishes the result as a new
//! snapshot for the node. [`server::FlowcServer`] streams snapshots to Envoy
//! over ADS.
//!
//! ## Crates
//!
//! - `flowc-types` - Envoy v3 protobuf types
//! - `flowc-core` - errors, node ids, versions, resource kinds
//! - `flowc-model` - API IR, deployment records, strategy config
//! - `flowc-translator` - builders, strategies, composite translator
//! - `flowc-cache` - snapshots, cache, deployment manager
//! - `flowc-server` - ADS gRPC server
//!
//! This crate re-exports all of them.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowc::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(ShardedCache::new());
//! let control_plane = ControlPlane::new(Arc::clone(&cache));
//! control_plane.initialize_node(&NodeId::new("edge-1"), 10000)?;
//!
//! FlowcServer::builder().cache(cache).build()?.serve().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod control_plane;

pub use control_plane::ControlPlane;

pub use flowc_cache as cache;
pub use flowc_core as core;
pub use flowc_model as model;
pub use flowc_server as server;
pub use flowc_translator as translator;
pub use flowc_types as types;

/// Common imports.
///
/// ```rust
/// use flowc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::ControlPlane;

    pub use flowc_core::{FlowcError, FlowcResult, NodeId, ResourceType, SnapshotVersion, XdsResources};

    pub use flowc_model::{
        Api, ApiDeployment, ApiType, DeploymentStatus, Endpoint, EndpointType, FlowcMetadata, GatewayTarget,
        StrategyConfig, UpstreamConfig, UpstreamScheme,
    };

    pub use flowc_translator::{CompositeTranslator, ConfigResolver, StrategyFactory, Translator};

    pub use flowc_cache::{Cache, CacheStats, DeploymentManager, ShardedCache, Snapshot, SnapshotBuilder};

    pub use flowc_server::{FlowcServer, FlowcServerBuilder, ServerConfig};
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Version as a display string.
    pub fn version_string() -> String {
        format!("flowc {VERSION} (MSRV {MSRV})")
    }
}

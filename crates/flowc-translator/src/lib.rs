//! # flowc-translator
//!
//! Turns an API description plus a deployment record into Envoy resources.
//!
//! The pipeline is assembled from six strategies ([`strategy`]) chosen per
//! deployment: configuration is resolved by [`ConfigResolver`] (built-in
//! defaults, gateway defaults, per-API config), instantiated by
//! [`StrategyFactory`], and run by the [`CompositeTranslator`].
//!
//! ## Example
//!
//! ```rust
//! use flowc_core::NodeId;
//! use flowc_model::{Api, ApiDeployment, ApiType, Endpoint, FlowcMetadata, GatewayTarget, UpstreamConfig};
//! use flowc_translator::{CompositeTranslator, ConfigResolver, StrategyFactory, Translator};
//!
//! let deployment = ApiDeployment::new(FlowcMetadata {
//!     name: "users-api".into(),
//!     version: "v1.0.0".into(),
//!     upstream: UpstreamConfig { host: "u.local".into(), port: 8080, ..Default::default() },
//!     gateway: GatewayTarget { node_id: "edge-1".into(), ..Default::default() },
//!     ..Default::default()
//! });
//! let api = Api::new(ApiType::Rest, "users-api", "v1.0.0")
//!     .with_base_path("/api/v1")
//!     .with_endpoint(Endpoint::new("getUser", "GET", "/users/{id}"));
//!
//! let config = ConfigResolver::new().resolve(deployment.strategy());
//! let strategies = StrategyFactory::new().create(&config, &deployment).unwrap();
//! let translator = CompositeTranslator::new(strategies).unwrap();
//!
//! let resources = translator.translate(&deployment, &api, &NodeId::new("edge-1")).unwrap();
//! assert_eq!(resources.clusters[0].name, "users-api-v1.0.0-cluster");
//! assert_eq!(resources.routes[0].name, "flowc_default_route");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod builders;
mod composite;
pub mod config;
mod factory;
pub mod path;
pub mod strategy;

pub use builders::{SHARED_LISTENER_NAME, SHARED_ROUTE_NAME};
pub use composite::CompositeTranslator;
pub use config::{ConfigResolver, ResolvedStrategyConfig};
pub use factory::StrategyFactory;
pub use strategy::StrategySet;

use flowc_core::{FlowcResult, NodeId, XdsResources};
use flowc_model::{Api, ApiDeployment};

/// IR to xDS translation.
pub trait Translator: Send + Sync {
    /// Translate `ir` for `deployment` on `node_id`.
    ///
    /// Either every phase succeeds and the full bundle is returned, or the
    /// first failure is returned and nothing is produced.
    fn translate(&self, deployment: &ApiDeployment, ir: &Api, node_id: &NodeId) -> FlowcResult<XdsResources>;

    /// Check the inputs without producing resources.
    fn validate(&self, deployment: &ApiDeployment, ir: &Api) -> FlowcResult<()>;

    /// Identifier built from the member strategies.
    fn name(&self) -> String;
}

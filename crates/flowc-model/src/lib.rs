//! # flowc-model
//!
//! Inputs of the flowc translator.
//!
//! - [`ir`] - the protocol-agnostic description of an API (`Api`)
//! - [`deployment`] - the persistent record binding one API to one node
//! - [`strategy`] - per-deployment strategy configuration
//!
//! All types derive serde so hosts can load them from YAML or JSON; the
//! translator itself never parses bundles.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod deployment;
pub mod ir;
pub mod strategy;

pub use deployment::{ApiDeployment, DeploymentStatus, FlowcMetadata, GatewayTarget, UpstreamConfig, UpstreamScheme};
pub use ir::{Api, ApiMetadata, ApiType, Endpoint, EndpointType};
pub use strategy::StrategyConfig;

//! # flowc-core
//!
//! Core types shared by every flowc crate.
//!
//! - [`FlowcError`] - the error type, with gRPC status mapping
//! - [`NodeId`] - identifier of a data-plane node
//! - [`SnapshotVersion`] - totally ordered per-node snapshot version
//! - [`ResourceType`] - the four xDS resource kinds and their push order
//! - [`Resource`] - trait implemented by every Envoy resource flowc serves
//! - [`XdsResources`] - the typed bundle produced by translation
//!
//! ## Example
//!
//! ```rust
//! use flowc_core::{NodeId, ResourceType, SnapshotVersion};
//!
//! let node = NodeId::new("edge-1");
//! let v1 = SnapshotVersion::initial();
//! assert!(v1.next() > v1);
//! assert_eq!(ResourceType::PUSH_ORDER[0], ResourceType::Cluster);
//! assert_eq!(node.as_str(), "edge-1");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod node;
mod resource;
mod resources;
mod type_url;
mod version;

pub use error::FlowcError;
pub use node::NodeId;
pub use resource::{BoxResource, Resource};
pub use resources::XdsResources;
pub use type_url::ResourceType;
pub use version::SnapshotVersion;

/// Result type alias using [`FlowcError`].
pub type Result<T> = std::result::Result<T, FlowcError>;

/// Alias used by downstream crates.
pub type FlowcResult<T> = Result<T>;

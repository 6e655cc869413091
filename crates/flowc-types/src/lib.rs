//! # flowc-types
//!
//! Envoy v3 protobuf types used by the flowc control plane.
//!
//! The message definitions come from the [`envoy_types`] crate, which compiles
//! the Envoy data-plane API together with the Google well-known types. This
//! crate re-exports them under [`pb`] and adds the small amount of glue every
//! other flowc crate needs:
//!
//! - [`pack`] / [`unpack`] for `google.protobuf.Any`
//! - well-known wrapper constructors ([`duration`], [`u32_value`], ...)
//! - type URLs of the Envoy extensions flowc configures ([`type_url`])

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod any;
pub mod type_url;
mod wkt;

pub use any::{pack, unpack};
pub use wkt::{bool_value, duration, u32_value, u64_value};

/// Generated protobuf packages (`envoy.*`, `google.*`, `xds.*`, ...).
pub use envoy_types::pb;

pub use prost::Message;

/// `google.protobuf.Any` as compiled into the Envoy type tree.
pub type Any = pb::google::protobuf::Any;

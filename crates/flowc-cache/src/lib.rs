//! # flowc-cache
//!
//! Snapshot cache and deployment manager for the flowc control plane.
//!
//! - [`ShardedCache`] - `DashMap`-backed per-node snapshot store with watches
//! - [`Snapshot`] - immutable, versioned resource set for one node
//! - [`SnapshotWatch`] - subscription that always yields the newest snapshot
//! - [`DeploymentManager`] - composes deployments per node and publishes
//!   consistent snapshots
//!
//! ## Key Design Decisions
//!
//! - Versions per node only move forward, including across node removal
//! - A snapshot is checked for referential integrity before it is published
//! - No `DashMap` reference is held across a watch notification
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use flowc_cache::{DeploymentManager, ShardedCache};
//! use flowc_core::NodeId;
//!
//! let manager = DeploymentManager::new(Arc::new(ShardedCache::new()));
//! let node = NodeId::new("edge-1");
//! let version = manager.initialize_node(&node, 10000).unwrap();
//! assert_eq!(manager.snapshot(&node).unwrap().version(), version);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
pub mod consistency;
mod manager;
mod snapshot;
mod stats;
mod watch;

pub use cache::{Cache, CacheBuilder, ShardedCache};
pub use manager::{DeploymentInfo, DeploymentManager, DeploymentResources};
pub use snapshot::{boxed, Snapshot, SnapshotBuilder, SnapshotResources};
pub use stats::CacheStats;
pub use watch::{SnapshotWatch, WatchId, WatchManager};

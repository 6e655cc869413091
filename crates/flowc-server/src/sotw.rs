//! State-of-the-world protocol state for one ADS stream.
//!
//! Tracks, per resource type, the subscribed names, the last nonce and
//! version sent, and what the client accepted or rejected. Decides which
//! [`DiscoveryResponse`]s a request or a new snapshot calls for.
//!
//! Rules:
//! - a request whose `response_nonce` is not the last nonce sent for its
//!   type is stale and ignored;
//! - a NACK records the rejected version, which is never sent again;
//! - an ACK advances the accepted version and only triggers a response when
//!   the subscribed names changed or a newer snapshot is pending;
//! - a snapshot change pushes every subscribed type whose sent version
//!   differs, in [`ResourceType::PUSH_ORDER`].

use std::collections::BTreeMap;

use flowc_cache::Snapshot;
use flowc_core::{ResourceType, SnapshotVersion};
use flowc_types::pb::envoy::config::core::v3::ControlPlane;
use flowc_types::pb::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};
use tracing::{debug, trace, warn};

use crate::metrics::AdsMetrics;
use crate::stream::{StreamContext, StreamPhase};
use crate::utils::generate_nonce;

/// Identifier reported in `DiscoveryResponse.control_plane`.
pub const CONTROL_PLANE_ID: &str = "flowc";

const WILDCARD: &str = "*";

#[derive(Debug, Default, Clone)]
struct TypeState {
    resource_names: Vec<String>,
    last_nonce: Option<String>,
    sent_version: Option<SnapshotVersion>,
    acked_version: Option<SnapshotVersion>,
    nacked_version: Option<SnapshotVersion>,
}

impl TypeState {
    fn names(&self) -> &[String] {
        if self.resource_names.iter().any(|n| n == WILDCARD) {
            &[]
        } else {
            &self.resource_names
        }
    }
}

/// Protocol state of one stream.
#[derive(Debug, Default)]
pub struct SotwState {
    types: BTreeMap<ResourceType, TypeState>,
    metrics: AdsMetrics,
}

impl SotwState {
    /// Empty state reporting into `metrics`.
    pub fn new(metrics: AdsMetrics) -> Self {
        Self {
            types: BTreeMap::new(),
            metrics,
        }
    }

    /// Apply a request; returns the response it calls for, if any.
    pub fn handle_request(
        &mut self,
        ctx: &mut StreamContext,
        request: &DiscoveryRequest,
        snapshot: Option<&Snapshot>,
    ) -> Option<DiscoveryResponse> {
        ctx.record_request();
        self.metrics.record_request(&request.type_url);

        let Some(kind) = ResourceType::from_type_url(&request.type_url) else {
            warn!(stream = %ctx.id(), type_url = %request.type_url, "unsupported resource type");
            return None;
        };

        let force = if request.response_nonce.is_empty() {
            debug!(
                stream = %ctx.id(),
                type_url = %request.type_url,
                names = ?request.resource_names,
                "subscribe"
            );
            self.types.entry(kind).or_default();
            true
        } else {
            let Some(state) = self
                .types
                .get_mut(&kind)
                .filter(|s| s.last_nonce.as_deref() == Some(request.response_nonce.as_str()))
            else {
                trace!(
                    stream = %ctx.id(),
                    type_url = %request.type_url,
                    nonce = %request.response_nonce,
                    "ignoring stale nonce"
                );
                return None;
            };

            if let Some(error) = &request.error_detail {
                state.nacked_version = state.sent_version;
                self.metrics.record_nack(&request.type_url);
                warn!(
                    stream = %ctx.id(),
                    node = ?ctx.node(),
                    type_url = %request.type_url,
                    version = %request.version_info,
                    error = %error.message,
                    "received NACK"
                );
                false
            } else {
                state.acked_version = state.sent_version;
                self.metrics.record_ack(&request.type_url);
                debug!(
                    stream = %ctx.id(),
                    type_url = %request.type_url,
                    version = %request.version_info,
                    "received ACK"
                );
                state.resource_names != request.resource_names
            }
        };

        let state = self.types.entry(kind).or_default();
        state.resource_names = request.resource_names.clone();
        ctx.advance(StreamPhase::Subscribed);

        let snapshot = snapshot?;
        if force || state.sent_version != Some(snapshot.version()) {
            Some(build_response(kind, state, snapshot))
        } else {
            None
        }
    }

    /// Responses for a newly published snapshot, in push order.
    pub fn handle_snapshot(&mut self, snapshot: &Snapshot) -> Vec<DiscoveryResponse> {
        self.types
            .iter_mut()
            .filter(|(_, state)| state.sent_version != Some(snapshot.version()))
            .map(|(kind, state)| build_response(*kind, state, snapshot))
            .collect()
    }

    /// Resource types the client subscribed to, in push order.
    pub fn subscribed(&self) -> Vec<ResourceType> {
        self.types.keys().copied().collect()
    }

    /// Last version the client accepted for `kind`.
    pub fn acked_version(&self, kind: ResourceType) -> Option<SnapshotVersion> {
        self.types.get(&kind).and_then(|s| s.acked_version)
    }

    /// Last version the client rejected for `kind`.
    pub fn nacked_version(&self, kind: ResourceType) -> Option<SnapshotVersion> {
        self.types.get(&kind).and_then(|s| s.nacked_version)
    }
}

fn build_response(kind: ResourceType, state: &mut TypeState, snapshot: &Snapshot) -> DiscoveryResponse {
    let nonce = generate_nonce();
    state.last_nonce = Some(nonce.clone());
    state.sent_version = Some(snapshot.version());

    DiscoveryResponse {
        version_info: snapshot.version().to_string(),
        resources: snapshot.encoded(kind, state.names()),
        type_url: kind.type_url().to_string(),
        nonce,
        control_plane: Some(ControlPlane {
            identifier: CONTROL_PLANE_ID.to_string(),
        }),
        ..Default::default()
    }
}

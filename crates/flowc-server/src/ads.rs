//! Aggregated Discovery Service.
//!
//! One spawned task per stream multiplexes three event sources: client
//! requests, snapshot changes for the stream's node, and server shutdown.
//! The first request must identify the node; responses for all four resource
//! types travel over the same stream in dependency order.

use std::sync::Arc;

use async_trait::async_trait;
use flowc_cache::{ShardedCache, Snapshot, SnapshotWatch};
use flowc_core::{FlowcError, NodeId};
use flowc_types::pb::envoy::service::discovery::v3::aggregated_discovery_service_server::{
    AggregatedDiscoveryService, AggregatedDiscoveryServiceServer,
};
use flowc_types::pb::envoy::service::discovery::v3::{
    DeltaDiscoveryRequest, DeltaDiscoveryResponse, DiscoveryRequest, DiscoveryResponse,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, instrument, warn};

use crate::metrics::AdsMetrics;
use crate::shutdown::{ShutdownController, ShutdownSignal};
use crate::sotw::SotwState;
use crate::stream::{StreamContext, StreamPhase};

/// Response stream handed to tonic.
pub type AdsResponseStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

/// ADS implementation over a [`ShardedCache`].
#[derive(Debug, Clone)]
pub struct AdsService {
    cache: Arc<ShardedCache>,
    shutdown: ShutdownController,
    metrics: AdsMetrics,
    response_buffer: usize,
}

impl AdsService {
    /// Serve snapshots from `cache`, stopping streams when `shutdown` fires.
    pub fn new(cache: Arc<ShardedCache>, shutdown: ShutdownController) -> Self {
        Self {
            cache,
            shutdown,
            metrics: AdsMetrics::new(),
            response_buffer: 16,
        }
    }

    /// Responses buffered per stream.
    pub fn with_response_buffer(mut self, size: usize) -> Self {
        self.response_buffer = size.max(1);
        self
    }

    /// Stream metrics.
    pub fn metrics(&self) -> &AdsMetrics {
        &self.metrics
    }

    /// Number of open streams.
    pub fn active_streams(&self) -> u64 {
        self.metrics.active_streams()
    }

    /// Wrap into the generated tonic server.
    pub fn into_server(self) -> AggregatedDiscoveryServiceServer<Self> {
        AggregatedDiscoveryServiceServer::new(self)
    }
}

#[async_trait]
impl AggregatedDiscoveryService for AdsService {
    type StreamAggregatedResourcesStream = AdsResponseStream;

    #[instrument(skip_all, name = "ads_stream")]
    async fn stream_aggregated_resources(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamAggregatedResourcesStream>, Status> {
        if self.shutdown.is_shutdown() {
            return Err(FlowcError::Shutdown.into());
        }

        let requests = request.into_inner();
        let (tx, rx) = mpsc::channel(self.response_buffer);
        let stream = AdsStream {
            cache: Arc::clone(&self.cache),
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.signal(),
            tx,
        };
        let guard = self.shutdown.register_operation();

        tokio::spawn(async move {
            stream.run(requests).await;
            drop(guard);
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type DeltaAggregatedResourcesStream = ReceiverStream<Result<DeltaDiscoveryResponse, Status>>;

    async fn delta_aggregated_resources(
        &self,
        _request: Request<Streaming<DeltaDiscoveryRequest>>,
    ) -> Result<Response<Self::DeltaAggregatedResourcesStream>, Status> {
        Err(Status::unimplemented("incremental xDS is not supported, use state-of-the-world ADS"))
    }
}

/// Why a stream loop stopped.
enum Exit {
    ClientClosed,
    ClientGone,
    NodeRemoved,
    Shutdown,
    Failed(Status),
}

struct AdsStream {
    cache: Arc<ShardedCache>,
    metrics: AdsMetrics,
    shutdown: ShutdownSignal,
    tx: mpsc::Sender<Result<DiscoveryResponse, Status>>,
}

impl AdsStream {
    async fn run(mut self, mut requests: Streaming<DiscoveryRequest>) {
        let mut ctx = StreamContext::new();
        let mut sotw = SotwState::new(self.metrics.clone());
        let mut watch: Option<SnapshotWatch> = None;
        let mut current: Option<Arc<Snapshot>> = None;

        self.metrics.stream_opened();
        info!(stream = %ctx.id(), "ADS stream opened");

        let exit = loop {
            tokio::select! {
                biased;

                _ = self.shutdown.wait() => break Exit::Shutdown,

                next = requests.next() => {
                    let request = match next {
                        Some(Ok(request)) => request,
                        Some(Err(status)) => {
                            debug!(stream = %ctx.id(), error = %status, "request stream error");
                            break Exit::ClientGone;
                        }
                        None => break Exit::ClientClosed,
                    };

                    if watch.is_none() {
                        let node = match hello_node(&request) {
                            Ok(node) => node,
                            Err(status) => break Exit::Failed(status),
                        };
                        info!(stream = %ctx.id(), node = %node, "node identified");
                        let mut w = self.cache.watch(&node);
                        current = w.latest();
                        watch = Some(w);
                        ctx.set_node(node);
                    } else if let Some(other) = other_node(&ctx, &request) {
                        warn!(
                            stream = %ctx.id(),
                            node = ?ctx.node(),
                            other = %other,
                            "ignoring request naming a different node"
                        );
                        continue;
                    }

                    if let Some(response) = sotw.handle_request(&mut ctx, &request, current.as_deref()) {
                        if !self.send(&mut ctx, response).await {
                            break Exit::ClientGone;
                        }
                    }
                }

                changed = next_snapshot(&mut watch) => {
                    let Some(snapshot) = changed else {
                        break Exit::NodeRemoved;
                    };
                    debug!(stream = %ctx.id(), version = %snapshot.version(), "snapshot changed");
                    let responses = sotw.handle_snapshot(&snapshot);
                    current = Some(snapshot);

                    let mut gone = false;
                    for response in responses {
                        if !self.send(&mut ctx, response).await {
                            gone = true;
                            break;
                        }
                    }
                    if gone {
                        break Exit::ClientGone;
                    }
                }
            }
        };

        match exit {
            Exit::Shutdown => {
                let _ = self.tx.send(Err(FlowcError::Shutdown.into())).await;
            }
            Exit::NodeRemoved => {
                let _ = self
                    .tx
                    .send(Err(Status::unavailable("node removed from control plane")))
                    .await;
            }
            Exit::Failed(status) => {
                warn!(stream = %ctx.id(), error = %status, "closing stream");
                let _ = self.tx.send(Err(status)).await;
            }
            Exit::ClientClosed | Exit::ClientGone => {}
        }

        ctx.advance(StreamPhase::Closed);
        self.metrics.stream_closed(ctx.duration());
        info!(
            stream = %ctx.id(),
            node = ?ctx.node(),
            duration = ?ctx.duration(),
            requests = ctx.request_count(),
            responses = ctx.response_count(),
            "ADS stream closed"
        );
    }

    async fn send(&mut self, ctx: &mut StreamContext, response: DiscoveryResponse) -> bool {
        self.metrics
            .record_response(&response.type_url, response.resources.len());
        debug!(
            stream = %ctx.id(),
            type_url = %response.type_url,
            version = %response.version_info,
            nonce = %response.nonce,
            resources = response.resources.len(),
            "sending response"
        );
        if self.tx.send(Ok(response)).await.is_err() {
            debug!(stream = %ctx.id(), "client disconnected");
            return false;
        }
        ctx.record_response();
        true
    }
}

async fn next_snapshot(watch: &mut Option<SnapshotWatch>) -> Option<Arc<Snapshot>> {
    match watch {
        Some(watch) => watch.changed().await,
        None => std::future::pending().await,
    }
}

#[allow(clippy::result_large_err)]
fn hello_node(request: &DiscoveryRequest) -> Result<NodeId, Status> {
    match request.node.as_ref().map(|n| n.id.as_str()) {
        Some(id) if !id.is_empty() => Ok(NodeId::new(id)),
        _ => Err(Status::invalid_argument("first request must carry node.id")),
    }
}

fn other_node<'a>(ctx: &StreamContext, request: &'a DiscoveryRequest) -> Option<&'a str> {
    let id = request.node.as_ref().map(|n| n.id.as_str()).filter(|id| !id.is_empty())?;
    match ctx.node() {
        Some(node) if node.as_str() != id => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowc_types::pb::envoy::config::core::v3::Node;

    fn request(node: Option<&str>) -> DiscoveryRequest {
        DiscoveryRequest {
            node: node.map(|id| Node {
                id: id.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn hello_requires_node_id() {
        assert_eq!(hello_node(&request(Some("edge-1"))).unwrap().as_str(), "edge-1");
        assert_eq!(
            hello_node(&request(Some(""))).unwrap_err().code(),
            tonic::Code::InvalidArgument
        );
        assert_eq!(
            hello_node(&request(None)).unwrap_err().code(),
            tonic::Code::InvalidArgument
        );
    }

    #[test]
    fn later_requests_may_omit_node() {
        let mut ctx = StreamContext::new();
        ctx.set_node(NodeId::new("edge-1"));
        assert_eq!(other_node(&ctx, &request(None)), None);
        assert_eq!(other_node(&ctx, &request(Some("edge-1"))), None);
        assert_eq!(other_node(&ctx, &request(Some("edge-2"))), Some("edge-2"));
    }
}

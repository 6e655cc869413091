//! ADS over a real TCP socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flowc::prelude::*;
use flowc::server::health::ADS_SERVICE_NAME;
use flowc::types::pb::envoy::config::cluster::v3::Cluster;
use flowc::types::pb::envoy::config::core::v3::Node;
use flowc::types::pb::envoy::service::discovery::v3::{
    DeltaDiscoveryRequest, DeltaDiscoveryResponse, DiscoveryRequest, DiscoveryResponse,
};
use flowc::types::pb::google::rpc::Status as RpcStatus;
use flowc::types::unpack;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::client::Grpc;
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

use crate::{api, deployment, NODE};

const SOTW_PATH: &str = "/envoy.service.discovery.v3.AggregatedDiscoveryService/StreamAggregatedResources";
const DELTA_PATH: &str = "/envoy.service.discovery.v3.AggregatedDiscoveryService/DeltaAggregatedResources";
const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

struct TestServer {
    addr: SocketAddr,
    control_plane: ControlPlane,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl TestServer {
    async fn start() -> Self {
        let cache = Arc::new(ShardedCache::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let server = FlowcServer::builder()
            .cache(Arc::clone(&cache))
            .shutdown_grace_period(Duration::from_millis(500))
            .build()
            .unwrap();
        let handle = tokio::spawn(server.serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            async {
                let _ = stopped.await;
            },
        ));

        Self {
            addr,
            control_plane: ControlPlane::new(cache),
            stop: Some(stop),
            handle,
        }
    }

    async fn channel(&self) -> Channel {
        Endpoint::from_shared(format!("http://{}", self.addr))
            .unwrap()
            .connect()
            .await
            .unwrap()
    }

    fn deploy(&self, name: &str) -> SnapshotVersion {
        self.control_plane
            .deploy(
                &deployment(name, "v1", None),
                &api(name, "v1", &format!("/{name}"), &[("list", "GET", "/")]),
            )
            .unwrap()
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

struct AdsClient {
    requests: mpsc::Sender<DiscoveryRequest>,
    responses: Streaming<DiscoveryResponse>,
}

impl AdsClient {
    async fn open(channel: Channel) -> Result<Self, Status> {
        let (requests, rx) = mpsc::channel(16);
        let mut grpc = Grpc::new(channel);
        grpc.ready().await.unwrap();
        let codec: ProstCodec<DiscoveryRequest, DiscoveryResponse> = ProstCodec::default();
        let responses = grpc
            .streaming(
                tonic::Request::new(ReceiverStream::new(rx)),
                PathAndQuery::from_static(SOTW_PATH),
                codec,
            )
            .await?
            .into_inner();
        Ok(Self { requests, responses })
    }

    async fn send(&self, request: DiscoveryRequest) {
        self.requests.send(request).await.unwrap();
    }

    async fn recv(&mut self) -> Result<DiscoveryResponse, Status> {
        timeout(WAIT, self.responses.message())
            .await
            .expect("response within timeout")
            .map(|r| r.expect("stream still open"))
    }

    async fn quiet(&mut self) -> bool {
        timeout(QUIET, self.responses.message()).await.is_err()
    }
}

fn request(kind: ResourceType, nonce: &str, node: Option<&str>) -> DiscoveryRequest {
    DiscoveryRequest {
        node: node.map(|id| Node {
            id: id.to_string(),
            ..Default::default()
        }),
        type_url: kind.type_url().to_string(),
        response_nonce: nonce.to_string(),
        ..Default::default()
    }
}

fn clusters(response: &DiscoveryResponse) -> Vec<String> {
    response
        .resources
        .iter()
        .map(|any| unpack::<Cluster>(any).unwrap().name)
        .collect()
}

#[tokio::test]
async fn subscribe_ack_and_push() {
    let mut server = TestServer::start().await;
    let node = NodeId::new(NODE);
    server.control_plane.initialize_node(&node, 10000).unwrap();
    let v2 = server.deploy("a");

    let mut client = AdsClient::open(server.channel().await).await.unwrap();
    client.send(request(ResourceType::Cluster, "", Some(NODE))).await;
    let cds = client.recv().await.unwrap();
    assert_eq!(cds.type_url, ResourceType::Cluster.type_url());
    assert_eq!(cds.version_info, v2.to_string());
    assert_eq!(clusters(&cds), vec!["a-v1-cluster"]);
    assert_eq!(cds.control_plane.as_ref().map(|c| c.identifier.as_str()), Some("flowc"));

    client
        .send(DiscoveryRequest {
            version_info: cds.version_info.clone(),
            ..request(ResourceType::Cluster, &cds.nonce, None)
        })
        .await;
    assert!(client.quiet().await, "ACK must not trigger a resend");

    client.send(request(ResourceType::Listener, "", None)).await;
    let lds = client.recv().await.unwrap();
    assert_eq!(lds.type_url, ResourceType::Listener.type_url());
    assert_eq!(lds.resources.len(), 1);

    let v3 = server.deploy("b");
    let first = client.recv().await.unwrap();
    let second = client.recv().await.unwrap();
    assert_eq!(first.type_url, ResourceType::Cluster.type_url());
    assert_eq!(second.type_url, ResourceType::Listener.type_url());
    assert_eq!(first.version_info, v3.to_string());
    assert_eq!(clusters(&first), vec!["a-v1-cluster", "b-v1-cluster"]);

    server.stop();
}

#[tokio::test]
async fn nack_is_not_retried() {
    let mut server = TestServer::start().await;
    server.control_plane.initialize_node(&NodeId::new(NODE), 10000).unwrap();
    server.deploy("a");

    let mut client = AdsClient::open(server.channel().await).await.unwrap();
    client.send(request(ResourceType::Cluster, "", Some(NODE))).await;
    let cds = client.recv().await.unwrap();

    client
        .send(DiscoveryRequest {
            error_detail: Some(RpcStatus {
                code: Code::InvalidArgument as i32,
                message: "rejected by proxy".into(),
                ..Default::default()
            }),
            ..request(ResourceType::Cluster, &cds.nonce, None)
        })
        .await;
    assert!(client.quiet().await, "NACKed version must not be resent");

    let v3 = server.deploy("b");
    let next = client.recv().await.unwrap();
    assert_eq!(next.version_info, v3.to_string());

    server.stop();
}

#[tokio::test]
async fn subscription_waits_for_first_snapshot() {
    let mut server = TestServer::start().await;
    let mut client = AdsClient::open(server.channel().await).await.unwrap();
    client.send(request(ResourceType::Cluster, "", Some(NODE))).await;
    assert!(client.quiet().await);

    let v1 = server
        .control_plane
        .initialize_node(&NodeId::new(NODE), 10000)
        .unwrap();
    let cds = client.recv().await.unwrap();
    assert_eq!(cds.version_info, v1.to_string());
    assert!(cds.resources.is_empty());

    server.stop();
}

#[tokio::test]
async fn first_request_must_name_node() {
    let mut server = TestServer::start().await;
    let status = match AdsClient::open(server.channel().await).await {
        Err(status) => status,
        Ok(mut client) => {
            client.send(request(ResourceType::Cluster, "", None)).await;
            client.recv().await.unwrap_err()
        }
    };
    assert_eq!(status.code(), Code::InvalidArgument);
    server.stop();
}

#[tokio::test]
async fn delta_is_unimplemented() {
    let mut server = TestServer::start().await;
    let mut grpc = Grpc::new(server.channel().await);
    grpc.ready().await.unwrap();

    let codec: ProstCodec<DeltaDiscoveryRequest, DeltaDiscoveryResponse> = ProstCodec::default();
    let requests = tokio_stream::iter(vec![DeltaDiscoveryRequest::default()]);
    let status = grpc
        .streaming(tonic::Request::new(requests), PathAndQuery::from_static(DELTA_PATH), codec)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
    server.stop();
}

#[tokio::test]
async fn health_reports_ads_serving() {
    let mut server = TestServer::start().await;
    let mut health = HealthClient::new(server.channel().await);

    for service in ["", ADS_SERVICE_NAME] {
        let response = health
            .check(HealthCheckRequest {
                service: service.to_string(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.status, ServingStatus::Serving as i32);
    }
    server.stop();
}

#[tokio::test]
async fn shutdown_closes_streams_with_unavailable() {
    let mut server = TestServer::start().await;
    server.control_plane.initialize_node(&NodeId::new(NODE), 10000).unwrap();

    let mut client = AdsClient::open(server.channel().await).await.unwrap();
    client.send(request(ResourceType::Listener, "", Some(NODE))).await;
    client.recv().await.unwrap();

    server.stop();
    let status = client.recv().await.unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);

    drop(client);
    let served = timeout(WAIT, &mut server.handle).await;
    assert!(matches!(served, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn removing_node_ends_its_stream() {
    let mut server = TestServer::start().await;
    let node = NodeId::new(NODE);
    server.control_plane.initialize_node(&node, 10000).unwrap();

    let mut client = AdsClient::open(server.channel().await).await.unwrap();
    client.send(request(ResourceType::Cluster, "", Some(NODE))).await;
    client.recv().await.unwrap();

    server.control_plane.remove_node(&node).unwrap();
    let status = client.recv().await.unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
    server.stop();
}

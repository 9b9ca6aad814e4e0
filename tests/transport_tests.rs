//! The server built by `pcbook serve` behind a real TCP listener.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::assert_code;
use pcbook::auth::{AuthClient, ClientAuthInterceptor, TokenRefresh, default_auth_methods};
use pcbook::client::LaptopClient;
use pcbook::commands::serve::build_server;
use pcbook::config::ServerConfig;
use pcbook::model::Filter;
use pcbook::reliability::retry::RetryConfig;
use pcbook::rpc::{self, pb};
use pcbook::sample;
use pcbook::store::MemoryImageStore;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tonic::{Code, Request, Status};

struct RunningServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl RunningServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::start_on(listener)
    }

    fn start_on(listener: TcpListener) -> Self {
        let server = build_server(&ServerConfig::default(), Arc::new(MemoryImageStore::new()))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(server.serve(listener, shutdown.clone()));
        Self {
            addr,
            shutdown,
            task,
        }
    }

    async fn channel(&self) -> Channel {
        rpc::connect(&self.addr.to_string(), RetryConfig::none())
            .await
            .unwrap()
    }

    async fn admin(&self) -> (LaptopClient, ClientAuthInterceptor) {
        let channel = self.channel().await;
        let interceptor = ClientAuthInterceptor::new(
            AuthClient::new(channel.clone(), "admin1", "secret"),
            default_auth_methods(),
            TokenRefresh::default(),
        )
        .await
        .unwrap();
        (LaptopClient::with_auth(channel, interceptor.clone()), interceptor)
    }

    /// Cancels the server and waits, at most five seconds, for `serve` to
    /// return.
    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

// =============================================================================
// Calls
// =============================================================================

#[tokio::test]
async fn test_full_flow_over_tcp() {
    let server = RunningServer::start().await;
    let (admin, interceptor) = server.admin().await;

    let laptop = sample::new_laptop();
    let id = admin.create_laptop(laptop.clone()).await.unwrap();
    assert_eq!(id, laptop.id);

    let image = vec![7u8; 3000];
    let uploaded = admin.upload_image(&id, "jpg", &image[..]).await.unwrap();
    assert_eq!(uploaded.size, 3000);

    let found = LaptopClient::new(server.channel().await)
        .search_laptop(Filter::default())
        .await
        .unwrap();
    assert_eq!(found, vec![laptop]);

    let replies = admin
        .rate_laptop(&[id.clone(), id.clone()], &[3.0, 5.0])
        .await
        .unwrap();
    assert_eq!(replies[1].rated_count, 2);
    assert_eq!(replies[1].average_score, 4.0);

    interceptor.shutdown();
    server.stop().await;
}

#[tokio::test]
async fn test_errors_cross_the_wire() {
    let server = RunningServer::start().await;
    let anonymous = LaptopClient::new(server.channel().await);

    assert_code(
        anonymous.create_laptop(sample::new_laptop()).await,
        Code::Unauthenticated,
    );

    let (admin, _interceptor) = server.admin().await;
    let unknown = uuid::Uuid::new_v4().to_string();
    assert_code(
        admin.upload_image(&unknown, ".png", &b"data"[..]).await,
        Code::NotFound,
    );
}

#[tokio::test]
async fn test_oversized_upload_over_tcp() {
    let server = RunningServer::start().await;
    let (admin, _interceptor) = server.admin().await;
    let id = admin.create_laptop(sample::new_laptop()).await.unwrap();

    let result = admin
        .upload_image(&id, ".png", &vec![0u8; (1 << 20) + 1][..])
        .await;
    assert_code(result, Code::InvalidArgument);
}

#[tokio::test]
async fn test_search_cancel_over_tcp() {
    let server = RunningServer::start().await;
    let (admin, _interceptor) = server.admin().await;
    for _ in 0..5 {
        admin.create_laptop(sample::new_laptop()).await.unwrap();
    }

    let mut stream = LaptopClient::new(server.channel().await)
        .search_laptop_stream(Filter::default())
        .await
        .unwrap();
    assert!(stream.next().await.unwrap().is_some());
    stream.cancel();
    assert_code(stream.next().await, Code::Cancelled);

    let all = LaptopClient::new(server.channel().await)
        .search_laptop(Filter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn test_unknown_method() {
    let server = RunningServer::start().await;
    let mut grpc = tonic::client::Grpc::new(server.channel().await);
    grpc.ready().await.unwrap();

    let result: Result<tonic::Response<pb::CreateLaptopResponse>, Status> = grpc
        .unary(
            Request::new(pb::CreateLaptopRequest::default()),
            http::uri::PathAndQuery::from_static("/pcbook.LaptopService/DeleteLaptop"),
            tonic::codec::ProstCodec::default(),
        )
        .await;
    assert_code(result.map(tonic::Response::into_inner), Code::Unimplemented);
}

// =============================================================================
// Dialing
// =============================================================================

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = rpc::connect(&addr.to_string(), RetryConfig::none()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_connect_retries_until_server_is_up() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let late = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        RunningServer::start_on(TcpListener::bind(addr).await.unwrap())
    });

    let retry = RetryConfig::network()
        .with_initial_delay(Duration::from_millis(50))
        .with_max_retries(10);
    let channel = rpc::connect(&addr.to_string(), retry).await.unwrap();

    let found = LaptopClient::new(channel)
        .search_laptop(Filter::default())
        .await
        .unwrap();
    assert!(found.is_empty());

    late.await.unwrap().stop().await;
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_idle_connections_do_not_block_shutdown() {
    let server = RunningServer::start().await;

    // One socket that never sends a byte, one that stops mid-preface, and
    // one HTTP/2 connection with no call in flight.
    let _silent = TcpStream::connect(server.addr).await.unwrap();
    let mut partial = TcpStream::connect(server.addr).await.unwrap();
    partial.write_all(b"PRI * HTTP/2.0\r\n").await.unwrap();
    let idle = LaptopClient::new(server.channel().await);
    idle.search_laptop(Filter::default()).await.unwrap();

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = RunningServer::start().await;
    let addr = server.addr;
    server.stop().await;

    assert!(TcpStream::connect(addr).await.is_err());
    assert!(rpc::connect(&addr.to_string(), RetryConfig::none()).await.is_err());
}

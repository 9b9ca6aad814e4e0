//! Shared test harness: a pcbook server on a loopback port plus client
//! helpers.
//!
//! `TestHost::builder()` wires the same components `pcbook serve` does, but
//! with an in-memory image store, a short token lifetime and an optional
//! manual clock. The server stops when the host is dropped.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pcbook::auth::{
    AccessPolicy, AuthClient, AuthInterceptor, ClientAuthInterceptor, Clock, JwtManager,
    ManualClock, TokenRefresh, default_access_policy, default_auth_methods,
};
use pcbook::client::LaptopClient;
use pcbook::model::User;
use pcbook::reliability::retry::RetryConfig;
use pcbook::rpc;
use pcbook::service::{AuthServer, LaptopServer, Server};
use pcbook::store::{
    InMemoryLaptopStore, InMemoryRatingStore, InMemoryUserStore, MemoryImageStore, UserStore,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;
use tonic::{Code, Status};

pub const SECRET_KEY: &str = "test-secret";
pub const TOKEN_DURATION: Duration = Duration::from_secs(60);

/// A running server and handles on its stores.
pub struct TestHost {
    pub addr: SocketAddr,
    pub channel: Channel,
    pub jwt: Arc<JwtManager>,
    pub laptops: Arc<InMemoryLaptopStore>,
    pub ratings: Arc<InMemoryRatingStore>,
    pub images: Arc<MemoryImageStore>,
    pub shutdown: CancellationToken,
    server: Option<JoinHandle<Result<(), tonic::transport::Error>>>,
}

pub struct TestHostBuilder {
    clock: Option<Arc<dyn Clock>>,
    policy: AccessPolicy,
    max_image_size: Option<usize>,
}

impl TestHost {
    pub fn builder() -> TestHostBuilder {
        TestHostBuilder {
            clock: None,
            policy: default_access_policy(),
            max_image_size: None,
        }
    }

    pub fn auth_client(&self, username: &str, password: &str) -> AuthClient {
        AuthClient::new(self.channel.clone(), username, password)
    }

    /// A client logged in as `username`, plus its interceptor.
    pub async fn client(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(LaptopClient, ClientAuthInterceptor), Status> {
        self.client_with_refresh(username, password, TokenRefresh::default())
            .await
    }

    pub async fn client_with_refresh(
        &self,
        username: &str,
        password: &str,
        refresh: TokenRefresh,
    ) -> Result<(LaptopClient, ClientAuthInterceptor), Status> {
        let interceptor = ClientAuthInterceptor::new(
            self.auth_client(username, password),
            default_auth_methods(),
            refresh,
        )
        .await?;
        let client = LaptopClient::with_auth(self.channel.clone(), interceptor.clone());
        Ok((client, interceptor))
    }

    pub async fn admin(&self) -> LaptopClient {
        self.client("admin1", "secret").await.unwrap().0
    }

    pub async fn user(&self) -> LaptopClient {
        self.client("user1", "secret").await.unwrap().0
    }

    /// Client that never attaches a token.
    pub fn anonymous(&self) -> LaptopClient {
        LaptopClient::new(self.channel.clone())
    }

    /// Cancels the server and waits for `serve` to return.
    pub async fn stop(mut self) -> Result<(), tonic::transport::Error> {
        self.shutdown.cancel();
        match self.server.take() {
            Some(server) => server.await.unwrap(),
            None => Ok(()),
        }
    }
}

impl Drop for TestHost {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl TestHostBuilder {
    pub fn clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock as Arc<dyn Clock>);
        self
    }

    pub fn policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_image_size(mut self, size: usize) -> Self {
        self.max_image_size = Some(size);
        self
    }

    pub async fn start(self) -> TestHost {
        let users = Arc::new(InMemoryUserStore::new());
        users.save(&User::new("admin1", "secret", "admin").unwrap()).unwrap();
        users.save(&User::new("user1", "secret", "user").unwrap()).unwrap();

        let mut jwt = JwtManager::new(SECRET_KEY, TOKEN_DURATION);
        if let Some(clock) = self.clock {
            jwt = jwt.with_clock(clock);
        }
        let jwt = Arc::new(jwt);

        let laptops = Arc::new(InMemoryLaptopStore::new());
        let ratings = Arc::new(InMemoryRatingStore::new());
        let images = Arc::new(MemoryImageStore::new());

        let mut laptop_server = LaptopServer::new(
            Arc::clone(&laptops) as _,
            Arc::clone(&images) as _,
            Arc::clone(&ratings) as _,
        );
        if let Some(size) = self.max_image_size {
            laptop_server = laptop_server.with_max_image_size(size);
        }

        let server = Server::new(
            AuthInterceptor::new(Arc::clone(&jwt), self.policy),
            AuthServer::new(users, Arc::clone(&jwt)),
            laptop_server,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

        let channel = rpc::connect(&addr.to_string(), RetryConfig::none())
            .await
            .unwrap();

        TestHost {
            addr,
            channel,
            jwt,
            laptops,
            ratings,
            images,
            shutdown,
            server: Some(handle),
        }
    }
}

pub fn assert_code<T: std::fmt::Debug>(result: Result<T, Status>, code: Code) {
    match result {
        Ok(value) => panic!("expected {code:?}, got Ok({value:?})"),
        Err(status) => assert_eq!(status.code(), code, "{status}"),
    }
}

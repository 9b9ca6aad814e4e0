//! Client side of authentication: logging in and keeping a token fresh.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::transport::Channel;
use tonic::{GrpcMethod, Request, Status};
use tracing::{debug, info, warn};

use crate::constants::{
    AUTHORIZATION_KEY, DEFAULT_CALL_TIMEOUT, DEFAULT_REFRESH_BACKOFF, DEFAULT_REFRESH_INTERVAL,
};
use crate::rpc::methods;
use crate::rpc::pb::LoginRequest;
use crate::rpc::pb::auth_service_client::AuthServiceClient;

/// Something that can hand out a fresh access token.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn login(&self) -> Result<String, Status>;
}

/// Calls `Login` with fixed credentials.
#[derive(Clone)]
pub struct AuthClient {
    client: AuthServiceClient<Channel>,
    username: String,
    password: String,
    timeout: Duration,
}

impl AuthClient {
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl TokenSource for AuthClient {
    /// Logs in and returns a fresh access token.
    ///
    /// `Unauthenticated` for bad credentials, otherwise the call status.
    async fn login(&self) -> Result<String, Status> {
        let mut request = Request::new(LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        });
        request.set_timeout(self.timeout);

        let response = self.client.clone().login(request).await?;
        Ok(response.into_inner().access_token)
    }
}

/// Timing of the background token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRefresh {
    /// Wait between successful refreshes.
    pub interval: Duration,
    /// Wait after a failed refresh.
    pub retry_backoff: Duration,
}

impl Default for TokenRefresh {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            retry_backoff: DEFAULT_REFRESH_BACKOFF,
        }
    }
}

/// Methods that need a token under the default access rules.
pub fn default_auth_methods() -> HashSet<String> {
    [methods::CREATE_LAPTOP, methods::UPLOAD_IMAGE, methods::RATE_LAPTOP]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Stops the refresh task once the last interceptor clone is gone.
struct RefreshTask {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Attaches a cached access token to outgoing calls and refreshes it in
/// the background.
///
/// Clones share the token and the refresh task. The task stops on
/// [`shutdown`](Self::shutdown) or when the last clone is dropped.
#[derive(Clone)]
pub struct ClientAuthInterceptor {
    token: Arc<ArcSwap<String>>,
    auth_methods: Arc<HashSet<String>>,
    refresh: Arc<RefreshTask>,
}

impl ClientAuthInterceptor {
    /// Logs in once, then starts the refresh task.
    ///
    /// # Errors
    ///
    /// Returns the status of the initial login if it fails; no task is
    /// started in that case.
    pub async fn new<S: TokenSource>(
        source: S,
        auth_methods: HashSet<String>,
        refresh: TokenRefresh,
    ) -> Result<Self, Status> {
        let initial = source.login().await?;
        info!("Logged in");

        let token = Arc::new(ArcSwap::from_pointee(initial));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(refresh_loop(
            source,
            Arc::clone(&token),
            refresh,
            shutdown.clone(),
        ));

        Ok(Self {
            token,
            auth_methods: Arc::new(auth_methods),
            refresh: Arc::new(RefreshTask { shutdown, task }),
        })
    }

    /// The token currently attached to calls.
    pub fn access_token(&self) -> Arc<String> {
        self.token.load_full()
    }

    /// Whether `method` gets a token attached.
    pub fn requires_token(&self, method: &str) -> bool {
        self.auth_methods.contains(method)
    }

    /// Stops the refresh task. The last token stays attached.
    pub fn shutdown(&self) {
        self.refresh.shutdown.cancel();
    }

    /// Whether the refresh task is still running.
    pub fn is_refreshing(&self) -> bool {
        !self.refresh.task.is_finished()
    }
}

impl Interceptor for ClientAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let Some(path) = request
            .extensions()
            .get::<GrpcMethod>()
            .map(|method| format!("/{}/{}", method.service(), method.method()))
        else {
            return Ok(request);
        };

        if self.requires_token(&path) {
            let value: AsciiMetadataValue = self
                .token
                .load()
                .parse()
                .map_err(|_| Status::internal("access token is not valid metadata"))?;
            request.metadata_mut().insert(AUTHORIZATION_KEY, value);
        }
        Ok(request)
    }
}

async fn refresh_loop<S: TokenSource>(
    source: S,
    token: Arc<ArcSwap<String>>,
    refresh: TokenRefresh,
    shutdown: CancellationToken,
) {
    let mut wait = refresh.interval;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(wait) => {},
        }

        let result = tokio::select! {
            () = shutdown.cancelled() => break,
            result = source.login() => result,
        };

        match result {
            Ok(fresh) => {
                token.store(Arc::new(fresh));
                debug!("Access token refreshed");
                wait = refresh.interval;
            },
            Err(status) => {
                warn!(
                    error = %status,
                    retry_in_secs = refresh.retry_backoff.as_secs(),
                    "Failed to refresh access token"
                );
                wait = refresh.retry_backoff;
            },
        }
    }
    debug!("Token refresh stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tonic::Code;

    /// Hands out `token-1`, `token-2`, ... unless marked down.
    #[derive(Clone, Default)]
    struct ScriptedSource {
        attempts: Arc<AtomicU32>,
        issued: Arc<AtomicU32>,
        down: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TokenSource for ScriptedSource {
        async fn login(&self) -> Result<String, Status> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                return Err(Status::unavailable("auth server is down"));
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("token-{n}"))
        }
    }

    const REFRESH: TokenRefresh = TokenRefresh {
        interval: Duration::from_secs(60),
        retry_backoff: Duration::from_secs(5),
    };

    async fn interceptor(source: &ScriptedSource) -> ClientAuthInterceptor {
        ClientAuthInterceptor::new(source.clone(), default_auth_methods(), REFRESH)
            .await
            .unwrap()
    }

    fn request_for(service: &'static str, method: &'static str) -> Request<()> {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(GrpcMethod::new(service, method));
        request
    }

    // =========================================================================
    // Refresh loop
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_on_interval() {
        let source = ScriptedSource::default();
        let interceptor = interceptor(&source).await;
        assert_eq!(interceptor.access_token().as_str(), "token-1");

        tokio::time::sleep(REFRESH.interval + Duration::from_millis(1)).await;
        assert_eq!(interceptor.access_token().as_str(), "token-2");

        tokio::time::sleep(REFRESH.interval).await;
        assert_eq!(interceptor.access_token().as_str(), "token-3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_token_and_backs_off() {
        let source = ScriptedSource::default();
        let interceptor = interceptor(&source).await;

        source.down.store(true, Ordering::SeqCst);
        tokio::time::sleep(REFRESH.interval + Duration::from_millis(1)).await;
        assert_eq!(source.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(interceptor.access_token().as_str(), "token-1");

        source.down.store(false, Ordering::SeqCst);
        tokio::time::sleep(REFRESH.retry_backoff).await;
        assert_eq!(interceptor.access_token().as_str(), "token-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_refresh() {
        let source = ScriptedSource::default();
        let interceptor = interceptor(&source).await;

        interceptor.shutdown();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!interceptor.is_refreshing());

        tokio::time::sleep(REFRESH.interval * 3).await;
        assert_eq!(source.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(interceptor.access_token().as_str(), "token-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_outlives_dropped_clones_only() {
        let source = ScriptedSource::default();
        let interceptor = interceptor(&source).await;

        drop(interceptor.clone());
        tokio::time::sleep(REFRESH.interval + Duration::from_millis(1)).await;
        assert!(interceptor.is_refreshing());
        assert_eq!(interceptor.access_token().as_str(), "token-2");

        drop(interceptor);
        tokio::time::sleep(REFRESH.interval * 3).await;
        assert_eq!(source.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_initial_login_failure() {
        let source = ScriptedSource::default();
        source.down.store(true, Ordering::SeqCst);

        let err = ClientAuthInterceptor::new(source, default_auth_methods(), REFRESH)
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), Code::Unavailable);
    }

    // =========================================================================
    // Interceptor
    // =========================================================================

    #[tokio::test]
    async fn test_token_attached_only_to_listed_methods() {
        let source = ScriptedSource::default();
        let mut interceptor = interceptor(&source).await;

        let create = interceptor
            .call(request_for("pcbook.LaptopService", "CreateLaptop"))
            .unwrap();
        let token = create.metadata().get(AUTHORIZATION_KEY).unwrap();
        assert_eq!(token.to_str().unwrap(), "token-1");

        let search = interceptor
            .call(request_for("pcbook.LaptopService", "SearchLaptop"))
            .unwrap();
        assert!(search.metadata().get(AUTHORIZATION_KEY).is_none());

        let unlabeled = interceptor.call(Request::new(())).unwrap();
        assert!(unlabeled.metadata().get(AUTHORIZATION_KEY).is_none());
    }

    #[test]
    fn test_default_auth_methods() {
        let methods = default_auth_methods();
        assert!(methods.contains(methods::CREATE_LAPTOP));
        assert!(methods.contains(methods::UPLOAD_IMAGE));
        assert!(methods.contains(methods::RATE_LAPTOP));
        assert!(!methods.contains(methods::SEARCH_LAPTOP));
        assert!(!methods.contains(methods::LOGIN));
    }
}

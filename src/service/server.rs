//! The gRPC server: both services behind one [`AuthLayer`].

use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AuthServer, LaptopServer};
use crate::auth::{AuthInterceptor, AuthLayer};
use crate::rpc::pb::auth_service_server::AuthServiceServer;
use crate::rpc::pb::laptop_service_server::LaptopServiceServer;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Every pcbook method behind one [`AuthInterceptor`].
#[derive(Clone)]
pub struct Server {
    interceptor: AuthInterceptor,
    auth: AuthServer,
    laptops: LaptopServer,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").finish_non_exhaustive()
    }
}

impl Server {
    pub fn new(interceptor: AuthInterceptor, auth: AuthServer, laptops: LaptopServer) -> Self {
        Self {
            interceptor,
            auth,
            laptops,
        }
    }

    pub fn interceptor(&self) -> &AuthInterceptor {
        &self.interceptor
    }

    /// Serves calls on `listener` until `shutdown` is cancelled.
    ///
    /// Authorization runs in the layer before any request message is
    /// decoded, for every call shape. On shutdown the listener closes,
    /// calls in flight finish, and idle connections are dropped.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the server fails.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), tonic::transport::Error> {
        let local_addr = listener.local_addr().ok();
        info!(addr = ?local_addr, "Serving pcbook");

        tonic::transport::Server::builder()
            .http2_keepalive_interval(Some(KEEPALIVE_INTERVAL))
            .http2_keepalive_timeout(Some(KEEPALIVE_TIMEOUT))
            .layer(AuthLayer::new(self.interceptor))
            .add_service(AuthServiceServer::new(self.auth))
            .add_service(LaptopServiceServer::new(self.laptops))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                shutdown.cancelled().await;
            })
            .await?;

        info!(addr = ?local_addr, "Server stopped");
        Ok(())
    }
}

//! `Login`: exchanges credentials for an access token.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::info;

use crate::auth::JwtManager;
use crate::rpc::pb::auth_service_server::AuthService;
use crate::rpc::pb::{LoginRequest, LoginResponse};
use crate::store::UserStore;

#[derive(Clone)]
pub struct AuthServer {
    users: Arc<dyn UserStore>,
    jwt: Arc<JwtManager>,
}

impl AuthServer {
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<JwtManager>) -> Self {
        Self { users, jwt }
    }

    /// Verifies the credentials and issues a token.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for an unknown user or a wrong password (the two
    /// are indistinguishable to the caller), `Internal` if signing fails.
    pub fn authenticate(&self, request: LoginRequest) -> Result<LoginResponse, Status> {
        let user = self
            .users
            .find(&request.username)
            .filter(|user| user.is_correct_password(&request.password))
            .ok_or_else(|| Status::unauthenticated("incorrect username or password"))?;

        let access_token = self.jwt.generate(&user)?;
        info!(username = %user.username, role = %user.role, "User logged in");
        Ok(LoginResponse { access_token })
    }
}

#[tonic::async_trait]
impl AuthService for AuthServer {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        self.authenticate(request.into_inner()).map(Response::new)
    }
}

//! Server-side access check run once per call, before any handler.
//!
//! [`AuthInterceptor::authorize`] holds the policy decision. [`AuthLayer`]
//! is the tower layer the server stacks in front of every service so the
//! decision runs when a call starts, for unary and streaming calls alike.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tonic::Status;
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tower::{Layer, Service};

use super::audit::{AuditEvent, log_audit_event};
use super::{AccessPolicy, JwtManager, TokenError, UserClaims};
use crate::constants::AUTHORIZATION_KEY;
use crate::rpc::methods;

/// Authorizes calls against an [`AccessPolicy`].
///
/// The same check applies to unary and streaming calls; [`AuthLayer`]
/// calls [`authorize`](Self::authorize) when a call is established and
/// never again for its messages.
#[derive(Clone)]
pub struct AuthInterceptor {
    jwt: Arc<JwtManager>,
    policy: Arc<AccessPolicy>,
}

impl AuthInterceptor {
    pub fn new(jwt: Arc<JwtManager>, policy: AccessPolicy) -> Self {
        Self {
            jwt,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decides whether a call to `method` carrying `metadata` may proceed.
    ///
    /// Returns `Ok(None)` for public methods and `Ok(Some(claims))` for an
    /// authorized caller.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when the token is missing, invalid or expired;
    /// `PermissionDenied` when the caller's role is not allowed.
    pub fn authorize(
        &self,
        method: &str,
        metadata: &MetadataMap,
    ) -> Result<Option<UserClaims>, Status> {
        let Some(allowed) = self.policy.roles_for(method) else {
            log_audit_event(AuditEvent::PublicCall {
                method: method.to_string(),
            });
            return Ok(None);
        };

        let Some(token) = access_token(metadata) else {
            self.reject(method, "missing_token", "authorization token is not provided");
            return Err(Status::unauthenticated("authorization token is not provided"));
        };

        let claims = match self.jwt.validate(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                self.reject(method, "expired_token", "access token has expired");
                return Err(Status::unauthenticated("access token has expired"));
            },
            Err(TokenError::Invalid(reason)) => {
                self.reject(method, "invalid_token", &reason);
                return Err(Status::unauthenticated(format!("access token is invalid: {reason}")));
            },
        };

        if !allowed.contains(&claims.role) {
            metrics::counter!("pcbook_auth_failures_total", "reason" => "permission_denied")
                .increment(1);
            log_audit_event(AuditEvent::PermissionDenied {
                method: method.to_string(),
                username: claims.sub,
                role: claims.role,
            });
            return Err(Status::permission_denied(
                "no permission to access this method",
            ));
        }

        log_audit_event(AuditEvent::AuthSuccess {
            method: method.to_string(),
            username: claims.sub.clone(),
            role: claims.role.clone(),
        });
        Ok(Some(claims))
    }

    fn reject(&self, method: &str, label: &'static str, reason: &str) {
        metrics::counter!("pcbook_auth_failures_total", "reason" => label).increment(1);
        log_audit_event(AuditEvent::AuthFailure {
            method: method.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Token from the `authorization` entry, with an optional `Bearer ` prefix.
fn access_token(metadata: &MetadataMap) -> Option<&str> {
    let value = metadata.get(AUTHORIZATION_KEY)?.to_str().ok()?.trim_start();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Metric label for a request path. Paths outside [`methods::ALL`] share
/// one label so clients cannot mint new series.
fn method_label(path: &str) -> &'static str {
    methods::ALL
        .iter()
        .copied()
        .find(|method| *method == path)
        .unwrap_or("unknown")
}

/// Tower layer that authorizes every call with an [`AuthInterceptor`].
///
/// A rejected call is answered with its status and never reaches the
/// service. An accepted call carries the caller's [`UserClaims`] in its
/// request extensions.
#[derive(Clone)]
pub struct AuthLayer {
    interceptor: AuthInterceptor,
}

impl AuthLayer {
    pub fn new(interceptor: AuthInterceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Service produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    interceptor: AuthInterceptor,
}

impl<S, B> Service<http::Request<B>> for AuthMiddleware<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        let path = request.uri().path().to_string();
        metrics::counter!("pcbook_calls_total", "method" => method_label(&path)).increment(1);

        let metadata = MetadataMap::from_headers(request.headers().clone());
        match self.interceptor.authorize(&path, &metadata) {
            Ok(claims) => {
                if let Some(claims) = claims {
                    request.extensions_mut().insert(claims);
                }
                // Call the instance that was polled ready, keep a fresh clone.
                let ready = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, ready);
                Box::pin(inner.call(request))
            },
            Err(status) => {
                let response = status.to_http();
                Box::pin(async move { Ok(response) })
            },
        }
    }
}

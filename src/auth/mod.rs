//! Authentication and role-based authorization.
//!
//! Server side:
//! - [`JwtManager`] issues and validates access tokens
//! - [`AccessPolicy`] maps method paths to allowed roles
//! - [`AuthInterceptor`] checks both once per call, run by [`AuthLayer`]
//!
//! Client side:
//! - [`AuthClient`] logs in
//! - [`ClientAuthInterceptor`] caches the token, refreshes it in the
//!   background and attaches it to allow-listed calls

pub mod audit;
mod client;
mod interceptor;
mod jwt;
mod policy;

pub use client::{
    AuthClient, ClientAuthInterceptor, TokenRefresh, TokenSource, default_auth_methods,
};
pub use interceptor::{AuthInterceptor, AuthLayer, AuthMiddleware};
pub use jwt::{Clock, JwtManager, ManualClock, SystemClock, TokenError, UserClaims};
pub use policy::{AccessPolicy, default_access_policy};

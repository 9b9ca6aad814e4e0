//! pcbook: a laptop catalog served over gRPC, with role-based access
//! control.
//!
//! - [`model`] - laptops, filters, users
//! - [`store`] - concurrency-safe stores
//! - [`auth`] - tokens, access policy, server layer and client interceptor
//! - [`rpc`] - generated protobuf types, conversions, deadlines, dialing
//! - [`service`] - service implementations and the server
//! - [`client`] - typed client for the laptop methods
//! - [`config`] - server and client configuration
//! - [`commands`] - the `pcbook` CLI

pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod constants;
pub mod model;
pub mod reliability;
pub mod rpc;
pub mod sample;
pub mod service;
pub mod store;

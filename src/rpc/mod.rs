//! gRPC plumbing shared by the server and the client.
//!
//! - [`pb`] - messages and service stubs generated from `proto/`
//! - [`methods`] - method paths, the keys of the access policy
//! - [`CallContext`] - per-call deadline read from `grpc-timeout`
//! - [`connect`] - dial a server with retry
//!
//! Conversions between [`crate::model`] records and their protobuf
//! messages live in `convert`.

mod channel;
mod context;
mod convert;
pub mod methods;

/// Generated protobuf messages, clients and servers.
#[allow(clippy::all, clippy::pedantic, missing_docs)]
pub mod pb {
    tonic::include_proto!("pcbook");
}

pub use channel::connect;
pub use context::CallContext;

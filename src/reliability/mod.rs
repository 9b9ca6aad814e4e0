//! Reliability helpers shared by the client side.

pub mod retry;

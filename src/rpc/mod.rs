//! RPC protocol implementation: envelope types, wire codec and per-method
//! parameter/result types shared by the `DataServer` and `BroadcastServer`.
//! The wire format is JSON over [`crate::transport`].

pub mod codec;
pub mod envelope;
pub mod methods;

pub use envelope::{RequestEnvelope, ResponseEnvelope};

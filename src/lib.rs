//! `talko` — a small multi-party chat backend split into two services:
//!
//! - [`data_server`]: a connection-per-request server that reads and writes
//!   users, chats and messages through a pluggable [`store::ChatStore`].
//! - [`broadcast_server`]: a server holding one long-lived stream per online
//!   user, fanning out server-pushed messages in real time.
//!
//! The two talk to each other, and to clients, over the same wire protocol:
//! [`transport`] frames carrying JSON-RPC-like [`rpc`] envelopes.

pub mod broadcast_server;
pub mod client;
pub mod data_server;
pub mod error;
pub mod model;
pub mod rpc;
pub mod store;
pub mod subscriber_table;
pub mod transport;
pub mod worker_pool;

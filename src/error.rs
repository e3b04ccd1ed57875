//! Error taxonomy shared by the transport, RPC and server layers.
//!
//! A small typed error enum per layer for conditions callers need to match
//! on, with `anyhow::Error` wrapped in at the store boundary for backend
//! failures that simply need to close the connection and log.

use thiserror::Error;

/// Errors raised while framing or moving bytes over a [`crate::transport`] connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer closed the connection")]
    EndOfStream,

    #[error("peer closed the connection mid-frame")]
    Closed,

    #[error("malformed frame header: {0:?}")]
    ProtocolError(String),

    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while encoding/decoding or dispatching an RPC envelope.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("response id {got} does not match request id {expected}")]
    ProtocolMismatch {
        expected: serde_json::Value,
        got: serde_json::Value,
    },

    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("requested entity was not found")]
    NotFound,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by a [`crate::store::ChatStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found")]
    NotFound,

    #[error("user {user_id} is not a participant in chat {chat_id}")]
    NotAParticipant { user_id: i64, chat_id: i64 },

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

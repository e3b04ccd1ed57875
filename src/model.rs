//! Domain entities shared by the store, the RPC layer and the client.
//! Expressed as explicit `serde`-derived structs rather than dynamic JSON
//! shapes, so a malformed payload fails to deserialize instead of silently
//! producing a partially-populated value.

use serde::{Deserialize, Serialize};

/// A registered chat participant. Never mutated or deleted through the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub user_name: String,
}

/// A persistent conversation with a fixed participant set.
///
/// `chat_name` is informational; for a private chat it is commonly
/// rewritten by `GetChats` to the other participant's `user_name` (see
/// [`crate::rpc::methods::get_chats`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: i64,
    pub chat_name: String,
    pub is_private: bool,
    pub users: Vec<User>,
    pub messages: Vec<Message>,
}

/// A single append-only chat message, embedding its author.
///
/// `message_ts` is stamped by the `DataServer` at insertion time and is
/// never accepted from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat_id: i64,
    pub user: User,
    pub message_text: String,
    pub message_ts: i64,
}

impl Message {
    pub fn user_id(&self) -> i64 {
        self.user.user_id
    }
}

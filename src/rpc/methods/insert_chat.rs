//! `InsertChat` — creates a chat, or returns the existing private chat for a
//! two-user pair (idempotent-for-pair semantics).

use serde::{Deserialize, Serialize};

use crate::model::Chat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub chat_name: String,
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub chat: Chat,
}

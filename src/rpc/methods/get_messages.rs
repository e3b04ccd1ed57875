//! `GetMessages` — every message in a chat, ordered by `message_ts` ascending.

use serde::{Deserialize, Serialize};

use crate::model::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub chat_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub messages: Vec<Message>,
}

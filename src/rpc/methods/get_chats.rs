//! `GetChats` — every chat `user_id` participates in, fully hydrated with
//! users and messages, newest-message-first.

use serde::{Deserialize, Serialize};

use crate::model::Chat;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub chats: Vec<Chat>,
}

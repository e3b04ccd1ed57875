//! `InsertMessage` — persists a message, stamping `message_ts` on the
//! server, then best-effort fans it out to the `BroadcastServer`.

use serde::{Deserialize, Serialize};

use crate::model::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub chat_id: i64,
    pub user_id: i64,
    pub message_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub message: Message,
}

//! `Broadcast` — a one-shot RPC from the `DataServer` asking the
//! `BroadcastServer` to push `message` to every online `receiver_ids`.

use serde::{Deserialize, Serialize};

use crate::model::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub receiver_ids: Vec<i64>,
    pub message: Message,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {}

//! `OpenStream` — registers the connection in the `SubscriberTable` under
//! `user_id` and keeps it open for server-pushed frames.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {}

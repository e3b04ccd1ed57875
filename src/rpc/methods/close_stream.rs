//! `CloseStream` — removes `user_id` from the `SubscriberTable`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {}

//! `InsertUser` — creates a new user; `user_id` is store-assigned.

use serde::{Deserialize, Serialize};

use crate::model::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub user: User,
}

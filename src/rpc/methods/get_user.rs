//! `GetUser` — look up a single user by id.

use serde::{Deserialize, Serialize};

use crate::model::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub user: User,
}

//! `ChatStore` — the persistence interface the core depends on. The SQL
//! schema and the durable storage engine are deliberately out of scope; this
//! module defines only the abstract capability plus an in-memory reference
//! implementation used by the crate's own test suite.
//!
//! A `Send + Sync + 'static` `async_trait` interface that the server is
//! generic over, backed in tests by an in-tree reference implementation.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::User;

/// A bare chat row, as persisted by the store — unlike
/// [`crate::model::Chat`], it does not carry its participants or messages;
/// those are hydrated by the `DataServer` via [`ChatStore::get_participants`]
/// and [`ChatStore::get_messages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRow {
    pub chat_id: i64,
    pub chat_name: String,
    pub is_private: bool,
}

/// A bare message row, as persisted by the store — carries `user_id` rather
/// than an embedded [`crate::model::User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub message_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub message_text: String,
    pub message_ts: i64,
}

/// Creates a fresh [`ChatStore`] handle for each connection, so that workers
/// never share a database handle — each accepted connection opens its own,
/// the way a request handler opening its own database connection per call
/// would.
#[async_trait]
pub trait ChatStoreFactory: Send + Sync + 'static {
    type Handle: ChatStore;

    async fn open(&self) -> Result<Self::Handle, StoreError>;
}

/// Persistence capability consumed by the `DataServer`.
///
/// Each operation is synchronous from the caller's perspective but exposed
/// as an `async fn` so implementations may back it with network or file
/// I/O. The store must be safe to open independently from multiple workers
/// concurrently; the core never shares a store handle across workers.
#[async_trait]
pub trait ChatStore: Send + Sync + 'static {
    async fn get_user(&self, user_id: i64) -> Result<User, StoreError>;

    async fn insert_user(&self, user_name: &str) -> Result<User, StoreError>;

    /// Chats `user_id` participates in. Order is unspecified; the
    /// `DataServer` re-sorts by newest-message-first after hydration.
    async fn get_chats(&self, user_id: i64) -> Result<Vec<ChatRow>, StoreError>;

    async fn get_participants(&self, chat_id: i64) -> Result<Vec<User>, StoreError>;

    /// The id of the private chat between these two users, if one exists.
    async fn get_private_chat_id(&self, user_a_id: i64, user_b_id: i64) -> Result<Option<i64>, StoreError>;

    /// Creates a new chat with `user_ids` as participants. Callers are
    /// responsible for the idempotent-for-pair check via
    /// [`ChatStore::get_private_chat_id`] before calling this for a
    /// two-participant chat.
    async fn insert_chat(
        &self,
        chat_name: &str,
        is_private: bool,
        user_ids: &[i64],
    ) -> Result<ChatRow, StoreError>;

    /// Messages in `chat_id`, ordered by `message_ts` ascending (ties broken
    /// by `message_id` ascending).
    async fn get_messages(&self, chat_id: i64) -> Result<Vec<MessageRow>, StoreError>;

    /// Persists a new message. `message_ts` is supplied by the caller (the
    /// `DataServer` stamps it, never the client). Returns
    /// [`StoreError::NotAParticipant`] if `user_id` is not a participant in
    /// `chat_id`.
    async fn insert_message(
        &self,
        chat_id: i64,
        user_id: i64,
        message_text: &str,
        message_ts: i64,
    ) -> Result<MessageRow, StoreError>;
}

/// Lets a [`ChatStoreFactory`] hand out a cheap `Arc` clone as a worker's
/// "own handle" for backends (like the in-memory reference store) whose
/// underlying state is already safely shared.
#[async_trait]
impl<T: ChatStore + ?Sized> ChatStore for std::sync::Arc<T> {
    async fn get_user(&self, user_id: i64) -> Result<User, StoreError> {
        (**self).get_user(user_id).await
    }

    async fn insert_user(&self, user_name: &str) -> Result<User, StoreError> {
        (**self).insert_user(user_name).await
    }

    async fn get_chats(&self, user_id: i64) -> Result<Vec<ChatRow>, StoreError> {
        (**self).get_chats(user_id).await
    }

    async fn get_participants(&self, chat_id: i64) -> Result<Vec<User>, StoreError> {
        (**self).get_participants(chat_id).await
    }

    async fn get_private_chat_id(&self, user_a_id: i64, user_b_id: i64) -> Result<Option<i64>, StoreError> {
        (**self).get_private_chat_id(user_a_id, user_b_id).await
    }

    async fn insert_chat(
        &self,
        chat_name: &str,
        is_private: bool,
        user_ids: &[i64],
    ) -> Result<ChatRow, StoreError> {
        (**self).insert_chat(chat_name, is_private, user_ids).await
    }

    async fn get_messages(&self, chat_id: i64) -> Result<Vec<MessageRow>, StoreError> {
        (**self).get_messages(chat_id).await
    }

    async fn insert_message(
        &self,
        chat_id: i64,
        user_id: i64,
        message_text: &str,
        message_ts: i64,
    ) -> Result<MessageRow, StoreError> {
        (**self).insert_message(chat_id, user_id, message_text, message_ts).await
    }
}

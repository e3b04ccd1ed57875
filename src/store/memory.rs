//! `MemoryChatStore` — an in-process reference [`ChatStore`] implementation.
//!
//! A minimal in-tree implementation of the storage trait that exists purely
//! so the crate's own test suite has something concrete to exercise the
//! server logic against. Production deployments are expected to supply
//! their own `ChatStore` backed by whatever durable engine they choose.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::User;
use crate::store::{ChatRow, ChatStore, ChatStoreFactory, MessageRow};

struct ChatEntry {
    row: ChatRow,
    participants: Vec<i64>,
}

#[derive(Default)]
struct State {
    users: HashMap<i64, User>,
    next_user_id: i64,
    chats: HashMap<i64, ChatEntry>,
    next_chat_id: i64,
    messages: HashMap<i64, Vec<MessageRow>>,
    next_message_id: i64,
}

/// An in-memory `ChatStore`, guarded by a single mutex. Fine for tests and
/// small deployments; a real backend would use per-worker connections to a
/// durable engine instead.
#[derive(Default)]
pub struct MemoryChatStore {
    state: Mutex<State>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn get_user(&self, user_id: i64) -> Result<User, StoreError> {
        let state = self.state.lock().unwrap();
        state.users.get(&user_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn insert_user(&self, user_name: &str) -> Result<User, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_user_id += 1;
        let user = User { user_id: state.next_user_id, user_name: user_name.to_string() };
        state.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn get_chats(&self, user_id: i64) -> Result<Vec<ChatRow>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .chats
            .values()
            .filter(|entry| entry.participants.contains(&user_id))
            .map(|entry| entry.row.clone())
            .collect())
    }

    async fn get_participants(&self, chat_id: i64) -> Result<Vec<User>, StoreError> {
        let state = self.state.lock().unwrap();
        let entry = state.chats.get(&chat_id).ok_or(StoreError::NotFound)?;
        Ok(entry
            .participants
            .iter()
            .filter_map(|user_id| state.users.get(user_id).cloned())
            .collect())
    }

    async fn get_private_chat_id(
        &self,
        user_a_id: i64,
        user_b_id: i64,
    ) -> Result<Option<i64>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut pair = [user_a_id, user_b_id];
        pair.sort_unstable();
        for entry in state.chats.values() {
            if !entry.row.is_private {
                continue;
            }
            let mut participants = entry.participants.clone();
            participants.sort_unstable();
            if participants == pair {
                return Ok(Some(entry.row.chat_id));
            }
        }
        Ok(None)
    }

    async fn insert_chat(
        &self,
        chat_name: &str,
        is_private: bool,
        user_ids: &[i64],
    ) -> Result<ChatRow, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_chat_id += 1;
        let row = ChatRow { chat_id: state.next_chat_id, chat_name: chat_name.to_string(), is_private };
        state.chats.insert(
            row.chat_id,
            ChatEntry { row: row.clone(), participants: user_ids.to_vec() },
        );
        Ok(row)
    }

    async fn get_messages(&self, chat_id: i64) -> Result<Vec<MessageRow>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut messages = state.messages.get(&chat_id).cloned().unwrap_or_default();
        messages.sort_by_key(|m| (m.message_ts, m.message_id));
        Ok(messages)
    }

    async fn insert_message(
        &self,
        chat_id: i64,
        user_id: i64,
        message_text: &str,
        message_ts: i64,
    ) -> Result<MessageRow, StoreError> {
        let mut state = self.state.lock().unwrap();
        let is_participant = state
            .chats
            .get(&chat_id)
            .map(|entry| entry.participants.contains(&user_id))
            .unwrap_or(false);
        if !is_participant {
            return Err(StoreError::NotAParticipant { user_id, chat_id });
        }

        state.next_message_id += 1;
        let message = MessageRow {
            message_id: state.next_message_id,
            chat_id,
            user_id,
            message_text: message_text.to_string(),
            message_ts,
        };
        state.messages.entry(chat_id).or_default().push(message.clone());
        Ok(message)
    }
}

/// Hands out `Arc<MemoryChatStore>` clones as worker handles. A real
/// `ChatStoreFactory` (e.g. one opening a new `sqlite3`/`sqlx` connection
/// per call) would not share underlying state this way; the in-memory
/// reference store does, since its state is already guarded for concurrent
/// access.
#[derive(Clone)]
pub struct MemoryChatStoreFactory(Arc<MemoryChatStore>);

impl MemoryChatStoreFactory {
    pub fn new() -> Self {
        Self(Arc::new(MemoryChatStore::new()))
    }

    pub fn handle(&self) -> Arc<MemoryChatStore> {
        self.0.clone()
    }
}

impl Default for MemoryChatStoreFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStoreFactory for MemoryChatStoreFactory {
    type Handle = Arc<MemoryChatStore>;

    async fn open(&self) -> Result<Self::Handle, StoreError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get_user_round_trips() {
        let store = MemoryChatStore::new();
        let user = store.insert_user("Alice").await.unwrap();
        assert_eq!(store.get_user(user.user_id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn get_user_reports_not_found() {
        let store = MemoryChatStore::new();
        assert!(matches!(store.get_user(42).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn private_chat_is_idempotent_for_a_pair() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();

        assert!(store.get_private_chat_id(a.user_id, b.user_id).await.unwrap().is_none());
        let chat = store.insert_chat("ignored", true, &[a.user_id, b.user_id]).await.unwrap();
        let found = store.get_private_chat_id(b.user_id, a.user_id).await.unwrap();
        assert_eq!(found, Some(chat.chat_id));
    }

    #[tokio::test]
    async fn insert_message_rejects_non_participant() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();
        let outsider = store.insert_user("C").await.unwrap();
        let chat = store.insert_chat("x", true, &[a.user_id, b.user_id]).await.unwrap();

        let err = store.insert_message(chat.chat_id, outsider.user_id, "hi", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAParticipant { .. }));
    }

    #[tokio::test]
    async fn get_messages_is_sorted_by_timestamp_ascending() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();
        let chat = store.insert_chat("x", true, &[a.user_id, b.user_id]).await.unwrap();

        store.insert_message(chat.chat_id, b.user_id, "second", 200).await.unwrap();
        store.insert_message(chat.chat_id, a.user_id, "first", 100).await.unwrap();

        let messages = store.get_messages(chat.chat_id).await.unwrap();
        assert_eq!(messages[0].message_text, "first");
        assert_eq!(messages[1].message_text, "second");
    }
}

//! `DataServer` — the connection-per-request server that reads and writes
//! conversation state.
//!
//! An accept loop that spawns one task per connection, dispatching each
//! request by the envelope's `method` string rather than a fixed procedure
//! number.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{RpcError, StoreError};
use crate::model::{Chat, Message, User};
use crate::rpc::{codec, methods};
use crate::store::{ChatRow, ChatStore, ChatStoreFactory};
use crate::worker_pool::WorkerPool;

/// Bind address, worker cap and `BroadcastServer` address for a `DataServer`.
/// Not sourced from environment variables — the core contract takes a plain
/// struct; the `src/bin/data_server.rs` binary is the only place
/// environment/CLI parsing happens.
#[derive(Debug, Clone)]
pub struct DataServerConfig {
    pub bind_addr: SocketAddr,
    pub broadcast_addr: SocketAddr,
    pub max_workers: usize,
}

impl DataServerConfig {
    pub const DEFAULT_MAX_WORKERS: usize = 10_000;
}

pub struct DataServer<F: ChatStoreFactory> {
    config: DataServerConfig,
    factory: Arc<F>,
}

impl<F: ChatStoreFactory> DataServer<F> {
    pub fn new(config: DataServerConfig, factory: F) -> Self {
        Self { config, factory: Arc::new(factory) }
    }

    /// Binds the listening socket and serves connections forever, returning
    /// only if the underlying TCP listener errors.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "DataServer listening");

        let pool = WorkerPool::new(self.config.max_workers);
        let factory = self.factory;
        let broadcast_addr = self.config.broadcast_addr;

        pool.accept_loop(listener, move |mut stream, addr, permit| {
            let factory = Arc::clone(&factory);
            async move {
                if let Err(e) = handle_connection(&mut stream, &factory, broadcast_addr).await {
                    warn!(%addr, error = %e, "data server request failed");
                }
                drop(permit);
            }
        })
        .await
    }
}

/// Handles exactly one request/response cycle on `stream`, then the caller
/// closes the connection regardless of outcome.
async fn handle_connection<F: ChatStoreFactory>(
    stream: &mut TcpStream,
    factory: &F,
    broadcast_addr: SocketAddr,
) -> Result<(), RpcError> {
    let request = codec::recv_request(stream).await?;
    let id = request.id.clone();
    let store = factory.open().await?;

    let outcome = dispatch(&store, &request.method, &request.params, broadcast_addr).await;
    match outcome {
        Ok(result) => codec::send_response(stream, id, result).await,
        Err(e) => {
            debug!(method = %request.method, error = %e, "data server returning error response");
            let error_result = serde_json::json!({ "error": e.to_string() });
            codec::send_response(stream, id, error_result).await
        }
    }
}

async fn dispatch<S: ChatStore>(
    store: &S,
    method: &str,
    params: &serde_json::Value,
    broadcast_addr: SocketAddr,
) -> Result<serde_json::Value, RpcError> {
    let result = match method {
        "GetUser" => {
            let req: methods::get_user::Request = serde_json::from_value(params.clone())
                .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
            let user = store.get_user(req.user_id).await?;
            serde_json::to_value(methods::get_user::Response { user })
        }
        "InsertUser" => {
            let req: methods::insert_user::Request = serde_json::from_value(params.clone())
                .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
            let user = store.insert_user(&req.user_name).await?;
            serde_json::to_value(methods::insert_user::Response { user })
        }
        "GetChats" => {
            let req: methods::get_chats::Request = serde_json::from_value(params.clone())
                .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
            let chats = get_chats(store, req.user_id).await?;
            serde_json::to_value(methods::get_chats::Response { chats })
        }
        "GetMessages" => {
            let req: methods::get_messages::Request = serde_json::from_value(params.clone())
                .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
            let messages = get_messages(store, req.chat_id).await?;
            serde_json::to_value(methods::get_messages::Response { messages })
        }
        "InsertChat" => {
            let req: methods::insert_chat::Request = serde_json::from_value(params.clone())
                .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
            let chat = insert_chat(store, &req.chat_name, &req.user_ids).await?;
            serde_json::to_value(methods::insert_chat::Response { chat })
        }
        "InsertMessage" => {
            let req: methods::insert_message::Request = serde_json::from_value(params.clone())
                .map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
            let message = insert_message(store, req.chat_id, req.user_id, &req.message_text).await?;
            fan_out(broadcast_addr, store, &message).await;
            serde_json::to_value(methods::insert_message::Response { message })
        }
        other => return Err(RpcError::UnknownMethod(other.to_string())),
    };
    result.map_err(|e| RpcError::MalformedEnvelope(e.to_string()))
}

/// Hydrates `row` with its full participant list and message history,
/// optionally rewriting a private chat's name to the other participant's
/// name when it is being returned to `viewer_id`.
async fn hydrate_chat<S: ChatStore>(
    store: &S,
    row: ChatRow,
    viewer_id: Option<i64>,
) -> Result<Chat, StoreError> {
    let users: Vec<User> = store.get_participants(row.chat_id).await?;
    let message_rows = store.get_messages(row.chat_id).await?;

    let mut user_by_id = std::collections::HashMap::new();
    for user in &users {
        user_by_id.insert(user.user_id, user.clone());
    }

    let mut messages = Vec::with_capacity(message_rows.len());
    for m in message_rows {
        let user = user_by_id.get(&m.user_id).cloned().unwrap_or(User {
            user_id: m.user_id,
            user_name: String::new(),
        });
        messages.push(Message {
            message_id: m.message_id,
            chat_id: m.chat_id,
            user,
            message_text: m.message_text,
            message_ts: m.message_ts,
        });
    }

    let chat_name = match (viewer_id, users.len()) {
        (Some(viewer_id), 2) => users
            .iter()
            .find(|u| u.user_id != viewer_id)
            .map(|u| u.user_name.clone())
            .unwrap_or(row.chat_name),
        _ => row.chat_name,
    };

    Ok(Chat { chat_id: row.chat_id, chat_name, is_private: row.is_private, users, messages })
}

/// `GetChats`: every chat `user_id` participates in, newest-message-first. A
/// chat with no messages sorts last rather than panicking on an empty
/// message list when computing its sort key.
async fn get_chats<S: ChatStore>(store: &S, user_id: i64) -> Result<Vec<Chat>, RpcError> {
    let rows = store.get_chats(user_id).await?;
    let mut chats = Vec::with_capacity(rows.len());
    for row in rows {
        chats.push(hydrate_chat(store, row, Some(user_id)).await?);
    }
    chats.sort_by_key(|chat| match chat.messages.last() {
        Some(m) => (0u8, std::cmp::Reverse(m.message_ts)),
        None => (1u8, std::cmp::Reverse(0)),
    });
    Ok(chats)
}

/// `GetMessages`: every message in `chat_id`, each carrying its author.
async fn get_messages<S: ChatStore>(store: &S, chat_id: i64) -> Result<Vec<Message>, RpcError> {
    let rows = store.get_messages(chat_id).await?;
    let users = store.get_participants(chat_id).await?;
    let mut user_by_id = std::collections::HashMap::new();
    for user in users {
        user_by_id.insert(user.user_id, user);
    }
    let messages = rows
        .into_iter()
        .map(|m| Message {
            message_id: m.message_id,
            chat_id: m.chat_id,
            user: user_by_id.get(&m.user_id).cloned().unwrap_or(User {
                user_id: m.user_id,
                user_name: String::new(),
            }),
            message_text: m.message_text,
            message_ts: m.message_ts,
        })
        .collect();
    Ok(messages)
}

/// `InsertChat`: for a two-participant request, returns the existing
/// private chat if one exists (idempotent-for-pair); otherwise always
/// creates a new chat. Coerces the store's private-chat lookup (which
/// returns a bare id) into a fully hydrated [`Chat`] by re-fetching and
/// filtering the requester's chat list, since the store interface exposes
/// no direct "fetch chat by id" operation.
async fn insert_chat<S: ChatStore>(
    store: &S,
    chat_name: &str,
    user_ids: &[i64],
) -> Result<Chat, RpcError> {
    let is_private = user_ids.len() == 2;
    let row = if is_private {
        match store.get_private_chat_id(user_ids[0], user_ids[1]).await? {
            Some(chat_id) => {
                let existing = store
                    .get_chats(user_ids[0])
                    .await?
                    .into_iter()
                    .find(|c| c.chat_id == chat_id)
                    .ok_or(StoreError::NotFound)?;
                existing
            }
            None => store.insert_chat(chat_name, true, user_ids).await?,
        }
    } else {
        store.insert_chat(chat_name, false, user_ids).await?
    };
    Ok(hydrate_chat(store, row, None).await?)
}

/// `InsertMessage`: stamps `message_ts` on the server and persists the
/// message. Never accepts a client-supplied timestamp.
async fn insert_message<S: ChatStore>(
    store: &S,
    chat_id: i64,
    user_id: i64,
    message_text: &str,
) -> Result<Message, RpcError> {
    let message_ts = now_millis();
    let row = store.insert_message(chat_id, user_id, message_text, message_ts).await?;
    let user = store.get_user(user_id).await?;
    Ok(Message {
        message_id: row.message_id,
        chat_id: row.chat_id,
        user,
        message_text: row.message_text,
        message_ts: row.message_ts,
    })
}

/// Best-effort fan-out of a freshly inserted message to the
/// `BroadcastServer`. Failures are logged and swallowed: the message is
/// already durable, and its real-time delivery is best-effort.
async fn fan_out<S: ChatStore>(broadcast_addr: SocketAddr, store: &S, message: &Message) {
    let participants = match store.get_participants(message.chat_id).await {
        Ok(participants) => participants,
        Err(e) => {
            warn!(chat_id = message.chat_id, error = %e, "fan-out: failed to list participants");
            return;
        }
    };
    let receiver_ids: Vec<i64> = participants
        .into_iter()
        .map(|u| u.user_id)
        .filter(|&id| id != message.user_id())
        .collect();
    if receiver_ids.is_empty() {
        return;
    }

    let request = methods::broadcast::Request { receiver_ids, message: message.clone() };
    let outcome: Result<methods::broadcast::Response, RpcError> =
        codec::call(broadcast_addr, "Broadcast", request).await;
    if let Err(e) = outcome {
        warn!(chat_id = message.chat_id, error = %e, "fan-out to broadcast server failed");
    }
}

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryChatStore;

    #[tokio::test]
    async fn get_chats_sorts_newest_message_first_and_empty_chats_last() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();
        let c = store.insert_user("C").await.unwrap();

        let with_messages = store.insert_chat("x", true, &[a.user_id, b.user_id]).await.unwrap();
        let empty = store.insert_chat("y", false, &[a.user_id, c.user_id]).await.unwrap();
        store.insert_message(with_messages.chat_id, a.user_id, "hi", 100).await.unwrap();

        let chats = get_chats(&store, a.user_id).await.unwrap();
        assert_eq!(chats[0].chat_id, with_messages.chat_id);
        assert_eq!(chats[1].chat_id, empty.chat_id);
    }

    #[tokio::test]
    async fn get_chats_rewrites_private_chat_name_to_other_participant() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("Alice").await.unwrap();
        let b = store.insert_user("Bob").await.unwrap();
        let chat = store.insert_chat("ignored", true, &[a.user_id, b.user_id]).await.unwrap();
        store.insert_message(chat.chat_id, a.user_id, "hi", 1).await.unwrap();

        let chats = get_chats(&store, a.user_id).await.unwrap();
        assert_eq!(chats[0].chat_name, "Bob");

        let chats = get_chats(&store, b.user_id).await.unwrap();
        assert_eq!(chats[0].chat_name, "Alice");
    }

    #[tokio::test]
    async fn insert_chat_is_idempotent_for_a_pair() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();

        let chat1 = insert_chat(&store, "x", &[a.user_id, b.user_id]).await.unwrap();
        let chat2 = insert_chat(&store, "y", &[b.user_id, a.user_id]).await.unwrap();
        assert_eq!(chat1.chat_id, chat2.chat_id);
    }

    #[tokio::test]
    async fn insert_chat_with_three_users_is_not_private() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();
        let c = store.insert_user("C").await.unwrap();

        let chat1 = insert_chat(&store, "project", &[a.user_id, b.user_id, c.user_id]).await.unwrap();
        let chat2 = insert_chat(&store, "project2", &[a.user_id, b.user_id, c.user_id]).await.unwrap();
        assert!(!chat1.is_private);
        assert_ne!(chat1.chat_id, chat2.chat_id);
    }

    #[tokio::test]
    async fn insert_message_stamps_a_server_side_timestamp() {
        let store = MemoryChatStore::new();
        let a = store.insert_user("A").await.unwrap();
        let b = store.insert_user("B").await.unwrap();
        let chat = store.insert_chat("x", true, &[a.user_id, b.user_id]).await.unwrap();

        let before = now_millis();
        let message = insert_message(&store, chat.chat_id, a.user_id, "hi").await.unwrap();
        let after = now_millis();
        assert!(message.message_ts >= before && message.message_ts <= after);
    }
}

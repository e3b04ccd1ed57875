//! A small client for talking to a `DataServer`/`BroadcastServer` pair.
//!
//! One-shot calls go straight through [`crate::rpc::codec::call`]. Opening a
//! stream is different: the connection to the `BroadcastServer` stays open
//! indefinitely, so [`ChatClient::open_stream`] hands the socket to a
//! background task that reads pushed frames and forwards each decoded
//! [`Message`] over an `mpsc` channel, the way `CommandQueue` in the RPC
//! layer hands work to its own worker task instead of processing inline.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::RpcError;
use crate::model::{Chat, Message, User};
use crate::rpc::{codec, methods};
use crate::transport;

/// A handle to both halves of a chat deployment.
#[derive(Debug, Clone, Copy)]
pub struct ChatClient {
    pub data_addr: SocketAddr,
    pub broadcast_addr: SocketAddr,
}

impl ChatClient {
    pub fn new(data_addr: SocketAddr, broadcast_addr: SocketAddr) -> Self {
        Self { data_addr, broadcast_addr }
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, RpcError> {
        let response: methods::get_user::Response =
            codec::call(self.data_addr, "GetUser", methods::get_user::Request { user_id }).await?;
        Ok(response.user)
    }

    pub async fn insert_user(&self, user_name: impl Into<String>) -> Result<User, RpcError> {
        let response: methods::insert_user::Response = codec::call(
            self.data_addr,
            "InsertUser",
            methods::insert_user::Request { user_name: user_name.into() },
        )
        .await?;
        Ok(response.user)
    }

    pub async fn get_chats(&self, user_id: i64) -> Result<Vec<Chat>, RpcError> {
        let response: methods::get_chats::Response =
            codec::call(self.data_addr, "GetChats", methods::get_chats::Request { user_id }).await?;
        Ok(response.chats)
    }

    pub async fn get_messages(&self, chat_id: i64) -> Result<Vec<Message>, RpcError> {
        let response: methods::get_messages::Response =
            codec::call(self.data_addr, "GetMessages", methods::get_messages::Request { chat_id })
                .await?;
        Ok(response.messages)
    }

    pub async fn insert_chat(
        &self,
        chat_name: impl Into<String>,
        user_ids: Vec<i64>,
    ) -> Result<Chat, RpcError> {
        let response: methods::insert_chat::Response = codec::call(
            self.data_addr,
            "InsertChat",
            methods::insert_chat::Request { chat_name: chat_name.into(), user_ids },
        )
        .await?;
        Ok(response.chat)
    }

    pub async fn insert_message(
        &self,
        chat_id: i64,
        user_id: i64,
        message_text: impl Into<String>,
    ) -> Result<Message, RpcError> {
        let response: methods::insert_message::Response = codec::call(
            self.data_addr,
            "InsertMessage",
            methods::insert_message::Request { chat_id, user_id, message_text: message_text.into() },
        )
        .await?;
        Ok(response.message)
    }

    /// Tells the `BroadcastServer` to stop delivering to `user_id` on
    /// whichever connection currently holds its subscription.
    pub async fn close_stream(&self, user_id: i64) -> Result<(), RpcError> {
        let _: methods::close_stream::Response = codec::call(
            self.broadcast_addr,
            "CloseStream",
            methods::close_stream::Request { user_id },
        )
        .await?;
        Ok(())
    }

    /// Opens a long-lived stream for `user_id` and returns a [`MessageStream`]
    /// fed by a background task. The connection stays open until the
    /// returned stream is dropped or the peer closes it.
    pub async fn open_stream(&self, user_id: i64) -> Result<MessageStream, RpcError> {
        let stream = codec::open_stream_request(
            self.broadcast_addr,
            "OpenStream",
            methods::open_stream::Request { user_id },
        )
        .await?;

        let (sender, receiver) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut stream = stream;
            loop {
                let payload = match transport::recv_frame(&mut stream).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        debug!(user_id, error = %e, "message stream ended");
                        return;
                    }
                };
                let envelope: crate::rpc::ResponseEnvelope = match serde_json::from_slice(&payload) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        debug!(user_id, error = %e, "malformed pushed frame, dropping");
                        continue;
                    }
                };
                #[derive(serde::Deserialize)]
                struct PushResult {
                    message: Message,
                }
                let message = match envelope.result_as::<PushResult>() {
                    Ok(result) => result.message,
                    Err(e) => {
                        debug!(user_id, error = %e, "pushed frame did not decode to a message");
                        continue;
                    }
                };
                if sender.send(message).await.is_err() {
                    return;
                }
            }
        });

        Ok(MessageStream { receiver })
    }
}

/// A stream of [`Message`]s pushed by the `BroadcastServer` for one user.
pub struct MessageStream {
    receiver: mpsc::Receiver<Message>,
}

impl MessageStream {
    /// Waits for the next pushed message, or `None` once the underlying
    /// connection has closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

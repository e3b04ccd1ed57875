//! One file per RPC method's `params`/`result` types.
//!
//! DataServer methods: [`get_user`], [`insert_user`], [`get_chats`],
//! [`get_messages`], [`insert_chat`], [`insert_message`].
//! BroadcastServer methods: [`open_stream`], [`close_stream`], [`broadcast`].

pub mod broadcast;
pub mod close_stream;
pub mod get_chats;
pub mod get_messages;
pub mod get_user;
pub mod insert_chat;
pub mod insert_message;
pub mod insert_user;
pub mod open_stream;

//! `SubscriberTable` — the `BroadcastServer`'s in-memory map from `user_id`
//! to its currently open stream connection.
//!
//! A small shared lookup table guarded for concurrent mutation, with a
//! per-entry lock so that concurrent `Broadcast` pushes to the *same*
//! subscriber serialize their writes instead of interleaving frames on the
//! wire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;

/// A registered subscriber's connection, identified by a unique connection
/// id so a later `CloseStream` call (arriving on a different connection than
/// the `OpenStream` it is closing) can tell whether the entry it removed
/// still belongs to its own socket.
pub struct Subscriber {
    pub id: u64,
    pub stream: AsyncMutex<TcpStream>,
}

/// Issues unique ids to accepted connections so table entries can be
/// compared by identity without relying on socket address equality.
#[derive(Default)]
pub struct ConnectionIdGenerator(AtomicU64);

impl ConnectionIdGenerator {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct SubscriberTable {
    entries: Mutex<HashMap<i64, Arc<Subscriber>>>,
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `stream` under `user_id`, replacing any previous entry
    /// without closing it. A second `OpenStream` for the same user replaces
    /// the table entry but leaves the old connection open until it next
    /// fails a push or is explicitly closed.
    pub fn open(&self, user_id: i64, connection_id: u64, stream: TcpStream) -> Arc<Subscriber> {
        let subscriber = Arc::new(Subscriber { id: connection_id, stream: AsyncMutex::new(stream) });
        self.entries.lock().unwrap().insert(user_id, subscriber.clone());
        subscriber
    }

    /// Removes `user_id`'s entry, returning it if one existed.
    pub fn close(&self, user_id: i64) -> Option<Arc<Subscriber>> {
        self.entries.lock().unwrap().remove(&user_id)
    }

    /// Looks up the current entry for `user_id`. A recipient that has
    /// disconnected without telling us simply fails its next push and gets
    /// reaped then; a stale read here is harmless.
    pub fn get(&self, user_id: i64) -> Option<Arc<Subscriber>> {
        self.entries.lock().unwrap().get(&user_id).cloned()
    }

    /// Removes `user_id`'s entry only if it is still the given subscriber —
    /// used after a failed push to avoid evicting a newer subscriber that
    /// replaced this one in the meantime.
    pub fn remove_if_current(&self, user_id: i64, subscriber: &Arc<Subscriber>) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(current) = entries.get(&user_id) {
            if Arc::ptr_eq(current, subscriber) {
                entries.remove(&user_id);
            }
        }
    }
}

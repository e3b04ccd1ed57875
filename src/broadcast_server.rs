//! `BroadcastServer` — maintains long-lived per-user streams and pushes
//! server-originated messages to whichever users currently have one open.
//!
//! Built on the same accept-loop shape as `DataServer`, with connections
//! fanning out into a shared [`crate::subscriber_table::SubscriberTable`]
//! instead of terminating per request.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, info, warn};

use crate::model::Message;
use crate::rpc::{codec, methods};
use crate::subscriber_table::{ConnectionIdGenerator, SubscriberTable};
use crate::worker_pool::WorkerPool;

/// Bind address and worker cap for a `BroadcastServer`.
#[derive(Debug, Clone)]
pub struct BroadcastServerConfig {
    pub bind_addr: SocketAddr,
    pub max_workers: usize,
}

impl BroadcastServerConfig {
    pub const DEFAULT_MAX_WORKERS: usize = 10_000;
}

pub struct BroadcastServer {
    config: BroadcastServerConfig,
    table: Arc<SubscriberTable>,
    connection_ids: Arc<ConnectionIdGenerator>,
}

impl BroadcastServer {
    pub fn new(config: BroadcastServerConfig) -> Self {
        Self {
            config,
            table: Arc::new(SubscriberTable::new()),
            connection_ids: Arc::new(ConnectionIdGenerator::default()),
        }
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "BroadcastServer listening");

        let pool = WorkerPool::new(self.config.max_workers);
        let table = self.table;
        let connection_ids = self.connection_ids;

        pool.accept_loop(listener, move |stream, addr, permit| {
            let table = Arc::clone(&table);
            let connection_ids = Arc::clone(&connection_ids);
            async move {
                handle_connection(stream, addr, permit, table, connection_ids).await;
            }
        })
        .await
    }
}

#[derive(Serialize)]
struct PushPayload<'a> {
    message: &'a Message,
}

/// Handles exactly one request on `stream`. For `OpenStream`, the
/// connection is moved into the [`SubscriberTable`] and the worker's permit
/// is dropped immediately: an open stream no longer occupies an accept-loop
/// slot. Every other method replies once and the connection closes when
/// `stream` goes out of scope.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    permit: OwnedSemaphorePermit,
    table: Arc<SubscriberTable>,
    connection_ids: Arc<ConnectionIdGenerator>,
) {
    let request = match codec::recv_request(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            debug!(%addr, error = %e, "broadcast server failed to read request");
            return;
        }
    };
    let id = request.id.clone();

    match request.method.as_str() {
        "OpenStream" => {
            let req: methods::open_stream::Request = match request.params_as() {
                Ok(req) => req,
                Err(e) => {
                    warn!(%addr, error = %e, "malformed OpenStream request");
                    return;
                }
            };
            if let Err(e) =
                codec::send_response(&mut stream, id, methods::open_stream::Response::default()).await
            {
                warn!(%addr, error = %e, "failed to acknowledge OpenStream");
                return;
            }
            let connection_id = connection_ids.next();
            table.open(req.user_id, connection_id, stream);
            // The socket now lives in the SubscriberTable; this worker slot
            // is free for the next connection.
            drop(permit);
            info!(user_id = req.user_id, connection_id, "stream opened");
        }
        "CloseStream" => {
            let req: methods::close_stream::Request = match request.params_as() {
                Ok(req) => req,
                Err(e) => {
                    warn!(%addr, error = %e, "malformed CloseStream request");
                    return;
                }
            };
            let removed = table.close(req.user_id);
            if let Err(e) =
                codec::send_response(&mut stream, id, methods::close_stream::Response::default()).await
            {
                warn!(%addr, error = %e, "failed to acknowledge CloseStream");
            }
            // Close the stored connection only after replying on this one.
            if let Some(removed) = removed {
                let mut removed_stream = removed.stream.lock().await;
                let _ = removed_stream.shutdown().await;
            }
        }
        "Broadcast" => {
            let req: methods::broadcast::Request = match request.params_as() {
                Ok(req) => req,
                Err(e) => {
                    warn!(%addr, error = %e, "malformed Broadcast request");
                    return;
                }
            };
            push_to_subscribers(&table, &req).await;
            if let Err(e) =
                codec::send_response(&mut stream, id, methods::broadcast::Response::default()).await
            {
                warn!(%addr, error = %e, "failed to acknowledge Broadcast");
            }
        }
        other => {
            warn!(%addr, method = other, "unknown broadcast server method");
            let error_result = serde_json::json!({ "error": format!("unknown method {other:?}") });
            let _ = codec::send_response(&mut stream, id, error_result).await;
        }
    }
}

/// Pushes `request.message` to every online receiver. Missing subscribers
/// are silently skipped; a subscriber whose push fails is removed from the
/// table.
async fn push_to_subscribers(table: &SubscriberTable, request: &methods::broadcast::Request) {
    let payload = PushPayload { message: &request.message };
    for &receiver_id in &request.receiver_ids {
        let Some(subscriber) = table.get(receiver_id) else { continue };
        let mut guard = subscriber.stream.lock().await;
        let result = codec::send_push(&mut guard, &payload).await;
        drop(guard);
        if let Err(e) = result {
            debug!(receiver_id, error = %e, "push failed, reaping subscriber");
            table.remove_if_current(receiver_id, &subscriber);
        }
    }
}

//! Shared accept loop / worker pool used by both `DataServer` and
//! `BroadcastServer`.
//!
//! Bounded by a `tokio::sync::Semaphore` sized to `max_workers` rather than
//! a manually reaped task list: a permit naturally represents "one in-flight
//! worker" and is released the instant a handler finishes — including
//! early, for an `OpenStream` handler that transitions into its indefinite
//! push loop and must stop counting against the pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

/// A bounded pool of in-flight connection workers shared by one listening
/// socket.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(max_workers)) }
    }

    /// Accepts connections from `listener` forever, handing each one to
    /// `handler` on its own task along with the [`OwnedSemaphorePermit`] that
    /// reserved its slot in the pool.
    ///
    /// Connections accepted while every slot is in use are shed immediately:
    /// shutdown-read-write and closed, with no reply. `handler` is
    /// responsible for dropping its permit once it no longer wants to
    /// occupy a pool slot — holding it for the handler's lifetime (the
    /// common case) or dropping it early before an indefinite push loop
    /// (`OpenStream`).
    pub async fn accept_loop<F, Fut>(&self, listener: TcpListener, handler: F) -> std::io::Result<()>
    where
        F: Fn(TcpStream, SocketAddr, OwnedSemaphorePermit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        loop {
            let (stream, addr) = listener.accept().await?;
            match Arc::clone(&self.semaphore).try_acquire_owned() {
                Ok(permit) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        handler(stream, addr, permit).await;
                    });
                }
                Err(_) => {
                    warn!(%addr, "worker pool saturated, shedding connection");
                    let mut stream = stream;
                    let _ = stream.shutdown().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpStream as ClientStream;

    #[tokio::test]
    async fn sheds_connections_beyond_max_workers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let pool = WorkerPool::new(1);

        let handled = Arc::new(AtomicUsize::new(0));
        let handled_clone = handled.clone();
        let accept_task = tokio::spawn(async move {
            let _ = pool
                .accept_loop(listener, move |_stream, _addr, permit| {
                    let handled = handled_clone.clone();
                    async move {
                        handled.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                        drop(permit);
                    }
                })
                .await;
        });

        let first = ClientStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let mut second = ClientStream::connect(addr).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // The second connection should have been shed: a read returns EOF.
        use tokio::io::AsyncReadExt;
        let mut buf = [0u8; 1];
        let n = second.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "shed connection should observe EOF");
        assert_eq!(handled.load(Ordering::SeqCst), 1);

        drop(first);
        accept_task.abort();
    }
}

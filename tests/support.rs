use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::sleep;

use talko::broadcast_server::{BroadcastServer, BroadcastServerConfig};
use talko::client::ChatClient;
use talko::data_server::{DataServer, DataServerConfig};
use talko::store::memory::MemoryChatStoreFactory;

/// Reserves an ephemeral port by binding to it and dropping the listener.
async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    listener.local_addr().expect("local addr")
}

/// Spawns a fresh `DataServer` + `BroadcastServer` pair backed by a
/// `MemoryChatStore`, and returns a client pointed at both.
pub async fn spawn_backend() -> ChatClient {
    let data_addr = free_addr().await;
    let broadcast_addr = free_addr().await;

    let broadcast_config = BroadcastServerConfig { bind_addr: broadcast_addr, max_workers: 64 };
    tokio::spawn(async move {
        BroadcastServer::new(broadcast_config).serve().await.expect("broadcast server crashed");
    });

    let data_config = DataServerConfig { bind_addr: data_addr, broadcast_addr, max_workers: 64 };
    tokio::spawn(async move {
        DataServer::new(data_config, MemoryChatStoreFactory::new())
            .serve()
            .await
            .expect("data server crashed");
    });

    sleep(Duration::from_millis(50)).await;
    ChatClient::new(data_addr, broadcast_addr)
}

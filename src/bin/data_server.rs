use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use talko::data_server::{DataServer, DataServerConfig};
use talko::store::memory::MemoryChatStoreFactory;

/// Runs the `DataServer`: the request/response half of the chat backend.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Address to bind the DataServer's listening socket to.
    #[arg(long, env = "TALKO_DATA_BIND_ADDR", default_value = "127.0.0.1:9001")]
    bind_addr: SocketAddr,

    /// Address of the BroadcastServer to fan new messages out to.
    #[arg(long, env = "TALKO_BROADCAST_ADDR", default_value = "127.0.0.1:9002")]
    broadcast_addr: SocketAddr,

    /// Maximum number of connections served concurrently.
    #[arg(long, env = "TALKO_MAX_WORKERS", default_value_t = DataServerConfig::DEFAULT_MAX_WORKERS)]
    max_workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "data server starting");

    let config = DataServerConfig {
        bind_addr: args.bind_addr,
        broadcast_addr: args.broadcast_addr,
        max_workers: args.max_workers,
    };
    let server = DataServer::new(config, MemoryChatStoreFactory::new());
    server.serve().await?;
    Ok(())
}

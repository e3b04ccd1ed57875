use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use talko::broadcast_server::{BroadcastServer, BroadcastServerConfig};

/// Runs the `BroadcastServer`: the real-time fan-out half of the chat backend.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Address to bind the BroadcastServer's listening socket to.
    #[arg(long, env = "TALKO_BROADCAST_BIND_ADDR", default_value = "127.0.0.1:9002")]
    bind_addr: SocketAddr,

    /// Maximum number of connections served concurrently (a subscriber that
    /// opens a stream frees its slot immediately; this caps transient
    /// OpenStream/CloseStream/Broadcast calls in flight).
    #[arg(long, env = "TALKO_MAX_WORKERS", default_value_t = BroadcastServerConfig::DEFAULT_MAX_WORKERS)]
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
    info!(version = env!("CARGO_PKG_VERSION"), "broadcast server starting");

    let config = BroadcastServerConfig { bind_addr: args.bind_addr, max_workers: args.max_workers };
    let server = BroadcastServer::new(config);
    server.serve().await?;
    Ok(())
}

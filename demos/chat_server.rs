//! Broadcast chat server.
//!
//! Every text frame from any client is echoed to all connected clients.
//!
//! Usage:
//!   cargo run --example chat_server
//!   CHAT_BIND=0.0.0.0:9000 cargo run --example chat_server -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use common::Args;
use resilient_chat::BroadcastServer;

// ============================================================================
// Constants
// ============================================================================

const BIND_ENV: &str = "CHAT_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:8080";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::init_logging(args.debug);

    let bind = std::env::var(BIND_ENV).unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let server = BroadcastServer::bind_addr(bind.as_str()).await?;

    println!("Listening on: {}", server.ws_url());
    println!("Press Ctrl+C to exit...");

    tokio::signal::ctrl_c().await?;

    println!(
        "Received {} messages from {} connected clients",
        server.received_count(),
        server.connection_count()
    );
    server.shutdown();

    Ok(())
}

//! Terminal chat client.
//!
//! Each line typed on stdin is submitted; every message the endpoint sends
//! is printed as it arrives. Kill the server and start it again to watch
//! the client reconnect on its own.
//!
//! Usage:
//!   cargo run --example chat_client
//!   CHAT_ENDPOINT=ws://127.0.0.1:9000 cargo run --example chat_client -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncBufReadExt, BufReader};

use common::Args;
use resilient_chat::{ChannelConfig, ChatView};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    common::init_logging(args.debug);

    let config = ChannelConfig::from_env()?;
    println!("Connecting to {}", config.endpoint());

    let mut view = ChatView::open(&config);
    view.channel().subscribe(|message| {
        if let Some(seq) = message.seq() {
            println!("{seq} {message}");
        }
    });
    view.channel()
        .connection()
        .on_state_change(|state| println!("[{state}]"));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                view.set_input(line);
                if view.submit().is_none() && !view.input().trim().is_empty() {
                    println!("[not connected, message dropped]");
                }
            }
        }
    }

    println!("Received {} messages", view.len());
    view.close();

    Ok(())
}

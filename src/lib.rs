//! Resilient chat - a WebSocket chat channel that survives disconnects.
//!
//! This library keeps a logical, always-available text channel to a chat
//! endpoint and exposes it to a UI layer as submit / subscribe.
//!
//! # Architecture
//!
//! ```text
//! ChatView ──submit──► MessageChannel ──send──► ResilientConnection ──► socket
//!    ▲                      │                        │
//!    └──── MessageLog ◄─────┴──── relay ◄──── on_message ◄──────────── socket
//! ```
//!
//! Key design principles:
//!
//! - One supervisor task per connection owns the socket
//! - Drops, refusals and timeouts all become `Closed`, then a retry
//! - Retry delays grow geometrically up to a cap
//! - Nothing is buffered while disconnected
//! - Teardown runs exactly once, also from `Drop`
//!
//! # Quick Start
//!
//! ```no_run
//! use resilient_chat::{ChannelConfig, ChatView, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ChannelConfig::builder()
//!         .endpoint("ws://localhost:8080")
//!         .build()?;
//!
//!     let mut view = ChatView::open(&config);
//!     view.set_input("hello");
//!     view.submit();
//!
//!     for row in view.rows() {
//!         println!("{row}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`MessageChannel`] facade, [`ChannelConfig`], [`Message`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`transport`] | [`ResilientConnection`], [`BroadcastServer`] |
//! | [`view`] | [`ChatView`], [`MessageLog`] |

// ============================================================================
// Modules
// ============================================================================

/// Message channel facade and configuration.
pub mod channel;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Listener registry.
mod listeners;

/// WebSocket transport layer.
///
/// Client connection with automatic reconnection, and the broadcast server.
pub mod transport;

/// UI-side state: chat view and message log.
pub mod view;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{
    ChannelConfig, ChannelConfigBuilder, DEFAULT_ENDPOINT, Direction, ENDPOINT_ENV, Message,
    MessageChannel, MessageLink,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, Sequence, SubscriptionId};

// Listener types
pub use listeners::Listener;

// Transport types
pub use transport::{BroadcastServer, ConnectionState, ReconnectPolicy, ResilientConnection};

// View types
pub use view::{ChatView, MessageLog};

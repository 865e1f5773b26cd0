//! WebSocket transport layer.
//!
//! This module owns the socket on both ends of the chat:
//!
//! ```text
//! ┌──────────────────────┐                         ┌──────────────────────┐
//! │  ResilientConnection │         WebSocket       │  BroadcastServer     │
//! │  (client)            │◄───────────────────────►│  (remote end)        │
//! │  supervisor task     │    ws://localhost:8080  │  task per client     │
//! └──────────────────────┘                         └──────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `ResilientConnection::open` - spawn the supervisor, state `Connecting`
//! 2. Handshake succeeds - state `Open`, frames flow both ways
//! 3. Drop, error, or remote close - state `Closed`, retry after backoff
//! 4. `ResilientConnection::close` - cancel retries, close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnect delay policy |
//! | `connection` | Self-healing client connection |
//! | `server` | Broadcast server |
//! | `state` | Connection lifecycle state |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect delay policy.
pub mod backoff;

/// Self-healing client connection.
pub mod connection;

/// WebSocket broadcast server.
pub mod server;

/// Connection lifecycle state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::ReconnectPolicy;
pub use connection::ResilientConnection;
pub use server::BroadcastServer;
pub use state::ConnectionState;

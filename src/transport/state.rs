//! Connection lifecycle state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a resilient connection.
///
/// ```text
/// Connecting ──handshake──► Open ──drop/error/close──► Closed
///     ▲                                                  │
///     └──────────────── retry after backoff ─────────────┘
/// ```
///
/// There is no terminal failure state. `Closed` is final only after an
/// explicit close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A handshake with the endpoint is in progress.
    Connecting,
    /// The transport is open and carrying frames.
    Open,
    /// No transport is open. A retry may be pending.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if the transport is open.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns the state name as a static string.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

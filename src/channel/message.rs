//! Chat message type.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::Sequence;

// ============================================================================
// Direction
// ============================================================================

/// Which way a message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Received from the remote endpoint.
    Inbound,
    /// Submitted locally.
    Outbound,
}

// ============================================================================
// Message
// ============================================================================

/// An immutable piece of chat text.
///
/// Inbound messages carry the [`Sequence`] position assigned when the
/// connection received them. Outbound messages are what
/// [`MessageChannel::submit`](super::MessageChannel::submit) handed to the
/// transport and have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Which way the message travelled.
    direction: Direction,

    /// Receipt position (inbound only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seq: Option<Sequence>,

    /// Payload text.
    text: String,
}

impl Message {
    /// Creates an inbound message received at position `seq`.
    #[inline]
    #[must_use]
    pub fn inbound(seq: Sequence, text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Inbound,
            seq: Some(seq),
            text: text.into(),
        }
    }

    /// Creates an outbound message.
    #[inline]
    #[must_use]
    pub fn outbound(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Outbound,
            seq: None,
            text: text.into(),
        }
    }

    /// Returns the payload text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the direction.
    #[inline]
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the receipt position, if inbound.
    #[inline]
    #[must_use]
    pub const fn seq(&self) -> Option<Sequence> {
        self.seq
    }

    /// Returns `true` if the message was received from the endpoint.
    #[inline]
    #[must_use]
    pub const fn is_inbound(&self) -> bool {
        matches!(self.direction, Direction::Inbound)
    }

    /// Consumes the message and returns its text.
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ============================================================================
// Tests
// ============================================================================

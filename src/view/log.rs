//! Append-only message log.

// ============================================================================
// Imports
// ============================================================================

use std::slice;

use serde::Serialize;

use crate::channel::Message;

// ============================================================================
// MessageLog
// ============================================================================

/// Received messages in display order.
///
/// Insertion order is authoritative: no reordering, no deduplication, no
/// removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageLog {
    /// Entries in arrival order.
    entries: Vec<Message>,
}

impl MessageLog {
    /// Creates an empty log.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Returns the number of messages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been received.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the message at display position `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.entries.get(index)
    }

    /// Returns the most recent message.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    /// Returns the messages as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.entries
    }

    /// Iterates in display order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Message> {
        self.entries.iter()
    }

    /// Returns the payload texts in display order.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(Message::text).collect()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

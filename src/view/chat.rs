//! Headless chat view.
//!
//! [`ChatView`] is the single owner of one chat screen's state: the input
//! text, the [`MessageLog`], and the channel feeding it. The channel is
//! opened when the view is constructed and disposed when the view is
//! closed or dropped.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::channel::{ChannelConfig, Message, MessageChannel, MessageLink};
use crate::transport::{ConnectionState, ResilientConnection};

use super::log::MessageLog;

// ============================================================================
// ChatView
// ============================================================================

/// One chat screen: input field, submit action, and message list.
///
/// # Example
///
/// ```ignore
/// use resilient_chat::{ChannelConfig, ChatView};
///
/// let mut view = ChatView::open(&ChannelConfig::from_env()?);
/// view.set_input("hello");
/// view.submit();
///
/// for row in view.rows() {
///     println!("{row}");
/// }
/// ```
pub struct ChatView<L: MessageLink = ResilientConnection> {
    /// Channel feeding the log.
    channel: MessageChannel<L>,
    /// Current input text.
    input: String,
    /// Received messages, appended only by the channel subscription.
    log: Arc<Mutex<MessageLog>>,
    /// Log length, bumped on every append.
    updates: watch::Receiver<usize>,
}

impl<L: MessageLink> fmt::Debug for ChatView<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatView")
            .field("input", &self.input)
            .field("messages", &self.len())
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

impl ChatView<ResilientConnection> {
    /// Opens a channel for `config` and mounts a view on it.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn open(config: &ChannelConfig) -> Self {
        Self::with_channel(MessageChannel::initialize(config))
    }
}

impl<L: MessageLink> ChatView<L> {
    /// Mounts a view on an existing channel.
    pub fn with_channel(channel: MessageChannel<L>) -> Self {
        let log = Arc::new(Mutex::new(MessageLog::new()));
        let (updates_tx, updates) = watch::channel(0usize);

        let sink = Arc::clone(&log);
        channel.subscribe(move |message| {
            let len = {
                let mut log = sink.lock();
                log.push(message.clone());
                log.len()
            };
            updates_tx.send_replace(len);
        });

        Self {
            channel,
            input: String::new(),
            log,
            updates,
        }
    }

    /// Replaces the input text.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Returns the input text.
    #[inline]
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Submits the current input.
    ///
    /// The input is left as is. Blank input is ignored. Returns the outbound
    /// message if the text was handed to an open transport.
    pub fn submit(&self) -> Option<Message> {
        self.channel.submit(&self.input)
    }

    /// Returns a snapshot of the received messages.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.log.lock().as_slice().to_vec()
    }

    /// Returns the most recently received message.
    #[must_use]
    pub fn latest(&self) -> Option<Message> {
        self.log.lock().last().cloned()
    }

    /// Returns the number of received messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns `true` if nothing has been received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Renders one row per received message, in arrival order.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .map(|message| message.text().to_owned())
            .collect()
    }

    /// Returns a receiver tracking the log length.
    #[must_use]
    pub fn log_updates(&self) -> watch::Receiver<usize> {
        self.updates.clone()
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Returns the underlying channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &MessageChannel<L> {
        &self.channel
    }

    /// Unmounts the view and disposes its channel.
    ///
    /// The log stays readable. Safe to call more than once.
    pub fn close(&self) {
        if !self.channel.is_disposed() {
            debug!(messages = self.len(), "Closing chat view");
        }
        self.channel.dispose();
    }
}

// ============================================================================
// Tests
// ============================================================================

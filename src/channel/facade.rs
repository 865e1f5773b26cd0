//! Message channel facade.
//!
//! [`MessageChannel`] gives the UI a send/receive surface that stays the
//! same through reconnects. It validates submissions, relays inbound
//! messages to subscribers, and tears the link down exactly once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::Result;
use crate::identifiers::SubscriptionId;
use crate::listeners::{Listener, ListenerSet};
use crate::transport::{ConnectionState, ResilientConnection};

use super::builder::ChannelConfig;
use super::message::Message;

// ============================================================================
// MessageLink
// ============================================================================

/// Transport seam underneath a [`MessageChannel`].
///
/// Implemented by [`ResilientConnection`]; tests substitute a recording
/// link.
pub trait MessageLink: Send + Sync + 'static {
    /// Transmits `payload` if possible. Returns `true` if handed off.
    fn send(&self, payload: &str) -> bool;

    /// Registers an inbound message handler.
    fn on_message(&self, handler: Listener<Message>) -> SubscriptionId;

    /// Removes an inbound message handler.
    fn remove_handler(&self, id: SubscriptionId) -> bool;

    /// Tears the link down.
    fn close(&self);

    /// Returns the current lifecycle state.
    fn state(&self) -> ConnectionState;
}

impl MessageLink for ResilientConnection {
    fn send(&self, payload: &str) -> bool {
        ResilientConnection::send(self, payload)
    }

    fn on_message(&self, handler: Listener<Message>) -> SubscriptionId {
        ResilientConnection::on_message(self, move |message: &Message| handler(message))
    }

    fn remove_handler(&self, id: SubscriptionId) -> bool {
        ResilientConnection::remove_handler(self, id)
    }

    fn close(&self) {
        ResilientConnection::close(self);
    }

    fn state(&self) -> ConnectionState {
        ResilientConnection::state(self)
    }
}

// ============================================================================
// MessageChannel
// ============================================================================

/// UI-facing chat channel.
///
/// # Example
///
/// ```ignore
/// use resilient_chat::{ChannelConfig, MessageChannel};
///
/// let config = ChannelConfig::builder().endpoint("ws://localhost:8080").build()?;
/// let channel = MessageChannel::initialize(&config);
///
/// channel.subscribe(|message| println!("{message}"));
/// channel.submit("hello");
/// channel.dispose();
/// ```
pub struct MessageChannel<L: MessageLink = ResilientConnection> {
    /// Underlying link.
    link: L,
    /// Relay handler registered on the link.
    relay: SubscriptionId,
    /// Subscribers receiving relayed messages.
    subscribers: Arc<ListenerSet<Message>>,
    /// Set once by [`dispose`](Self::dispose). Checked by every subscriber.
    disposed: Arc<AtomicBool>,
}

impl<L: MessageLink> fmt::Debug for MessageChannel<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannel")
            .field("state", &self.link.state())
            .field("subscribers", &self.subscribers.len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MessageChannel - Constructors
// ============================================================================

impl MessageChannel<ResilientConnection> {
    /// Opens a resilient connection for `config` and wraps it.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn initialize(config: &ChannelConfig) -> Self {
        let connection =
            ResilientConnection::open(config.endpoint().clone(), config.reconnect().clone());
        Self::with_link(connection)
    }

    /// Validates `endpoint` with default settings and initializes a channel.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - `ws://` address, e.g. `"ws://localhost:8080"`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`](crate::Error::InvalidEndpoint) if
    /// the address is unusable.
    pub fn connect(endpoint: &str) -> Result<Self> {
        let config = ChannelConfig::builder().endpoint(endpoint).build()?;
        Ok(Self::initialize(&config))
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &ResilientConnection {
        &self.link
    }

    /// Returns a receiver that observes connection state transitions.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.link.state_changes()
    }
}

impl<L: MessageLink> MessageChannel<L> {
    /// Wraps an existing link and starts relaying its inbound messages.
    pub fn with_link(link: L) -> Self {
        let subscribers: Arc<ListenerSet<Message>> = Arc::new(ListenerSet::new());

        let relay_target = Arc::clone(&subscribers);
        let relay = link.on_message(Arc::new(move |message: &Message| {
            relay_target.emit(message);
        }));

        Self {
            link,
            relay,
            subscribers,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }
}

// ============================================================================
// MessageChannel - Public API
// ============================================================================

impl<L: MessageLink> MessageChannel<L> {
    /// Submits user text.
    ///
    /// Empty and whitespace-only text is ignored silently, as is anything
    /// submitted after [`dispose`](Self::dispose). Valid text is forwarded
    /// unchanged. Returns the outbound [`Message`] if the link accepted it.
    pub fn submit(&self, text: &str) -> Option<Message> {
        if self.is_disposed() {
            trace!("Submission after dispose ignored");
            return None;
        }

        if text.trim().is_empty() {
            trace!("Blank submission ignored");
            return None;
        }

        self.link.send(text).then(|| Message::outbound(text))
    }

    /// Registers a listener for every inbound message, in arrival order.
    ///
    /// A listener never runs once the channel is disposed, even for the
    /// message whose delivery triggered the dispose.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let disposed = Arc::clone(&self.disposed);
        self.subscribers.add(Arc::new(move |message: &Message| {
            if !disposed.load(Ordering::Acquire) {
                listener(message);
            }
        }))
    }

    /// Removes a listener.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns the link's lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Returns the underlying link.
    #[inline]
    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Closes the link and removes every listener.
    ///
    /// Only the first call has an effect, including when re-entered from a
    /// listener or from `Drop`.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.link.close();
        self.link.remove_handler(self.relay);
        self.subscribers.clear();

        debug!("Message channel disposed");
    }
}

impl<L: MessageLink> Drop for MessageChannel<L> {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::channel::Direction;
    use crate::identifiers::Sequence;

    /// Link that records calls and lets tests inject inbound messages.
    #[derive(Default)]
    struct SpyLink {
        sent: Mutex<Vec<String>>,
        handlers: ListenerSet<Message>,
        close_calls: Mutex<u32>,
        open: AtomicBool,
    }

    impl SpyLink {
        fn open() -> Arc<Self> {
            let link = Arc::new(Self::default());
            link.open.store(true, Ordering::SeqCst);
            link
        }

        fn inject(&self, seq: u64, text: &str) {
            self.handlers.emit(&Message::inbound(Sequence::new(seq), text));
        }
    }

    impl MessageLink for Arc<SpyLink> {
        fn send(&self, payload: &str) -> bool {
            if !self.open.load(Ordering::SeqCst) {
                return false;
            }
            self.sent.lock().push(payload.to_owned());
            true
        }

        fn on_message(&self, handler: Listener<Message>) -> SubscriptionId {
            self.handlers.add(handler)
        }

        fn remove_handler(&self, id: SubscriptionId) -> bool {
            self.handlers.remove(id)
        }

        fn close(&self) {
            *self.close_calls.lock() += 1;
            self.open.store(false, Ordering::SeqCst);
        }

        fn state(&self) -> ConnectionState {
            if self.open.load(Ordering::SeqCst) {
                ConnectionState::Open
            } else {
                ConnectionState::Closed
            }
        }
    }

    #[test]
    fn test_blank_submissions_never_reach_link() {
        let link = SpyLink::open();
        let channel = MessageChannel::with_link(Arc::clone(&link));

        assert!(channel.submit("").is_none());
        assert!(channel.submit("   ").is_none());
        assert!(channel.submit("\t\n").is_none());
        assert!(link.sent.lock().is_empty());
    }

    #[test]
    fn test_submit_forwards_text_unchanged() {
        let link = SpyLink::open();
        let channel = MessageChannel::with_link(Arc::clone(&link));

        assert!(channel.submit("ping").is_some());
        let sent = channel.submit("  padded  ").expect("link is open");
        assert_eq!(sent.direction(), Direction::Outbound);
        assert_eq!(sent.text(), "  padded  ");
        assert_eq!(*link.sent.lock(), vec!["ping", "  padded  "]);
    }

    #[test]
    fn test_submit_while_link_down_is_dropped() {
        let link = Arc::new(SpyLink::default());
        let channel = MessageChannel::with_link(Arc::clone(&link));

        assert!(channel.submit("lost").is_none());
        assert!(link.sent.lock().is_empty());
    }

    #[test]
    fn test_subscribers_receive_in_arrival_order() {
        let link = SpyLink::open();
        let channel = MessageChannel::with_link(Arc::clone(&link));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        channel.subscribe(move |message| seen_clone.lock().push(message.text().to_owned()));

        link.inject(1, "hello");
        link.inject(2, "world");

        assert_eq!(*seen.lock(), vec!["hello", "world"]);
    }

    #[test]
    fn test_unsubscribe() {
        let link = SpyLink::open();
        let channel = MessageChannel::with_link(Arc::clone(&link));

        let id = channel.subscribe(|_| {});
        assert_eq!(channel.subscriber_count(), 1);
        assert!(channel.unsubscribe(id));
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let link = SpyLink::open();
        let channel = MessageChannel::with_link(Arc::clone(&link));
        channel.subscribe(|_| {});

        channel.dispose();
        channel.dispose();

        assert_eq!(*link.close_calls.lock(), 1);
        assert!(link.handlers.is_empty());
        assert_eq!(channel.subscriber_count(), 0);
        assert!(channel.submit("after").is_none());
        assert!(link.sent.lock().is_empty());
    }

    #[test]
    fn test_drop_disposes_once() {
        let link = SpyLink::open();
        {
            let channel = MessageChannel::with_link(Arc::clone(&link));
            channel.dispose();
        }
        assert_eq!(*link.close_calls.lock(), 1);
    }

    #[test]
    fn test_listener_may_dispose_reentrantly() {
        let link = SpyLink::open();
        let channel = Arc::new(MessageChannel::with_link(Arc::clone(&link)));

        let count = Arc::new(Mutex::new(0u32));
        let count_clone = Arc::clone(&count);
        let weak = Arc::downgrade(&channel);
        channel.subscribe(move |_| {
            *count_clone.lock() += 1;
            if let Some(channel) = weak.upgrade() {
                channel.dispose();
            }
        });

        link.inject(1, "bye");
        link.inject(2, "ignored");

        assert_eq!(*count.lock(), 1);
        assert_eq!(*link.close_calls.lock(), 1);
        assert!(channel.is_disposed());
    }

    #[test]
    fn test_dispose_mid_delivery_skips_later_listeners() {
        let link = SpyLink::open();
        let channel = Arc::new(MessageChannel::with_link(Arc::clone(&link)));

        let weak = Arc::downgrade(&channel);
        channel.subscribe(move |_| {
            if let Some(channel) = weak.upgrade() {
                channel.dispose();
            }
        });

        let late = Arc::new(Mutex::new(Vec::new()));
        let late_clone = Arc::clone(&late);
        channel.subscribe(move |message| late_clone.lock().push(message.text().to_owned()));

        link.inject(1, "last");

        assert!(channel.is_disposed());
        assert!(late.lock().is_empty());
    }
}

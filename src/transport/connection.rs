//! Resilient WebSocket connection.
//!
//! A [`ResilientConnection`] keeps a logical channel to one endpoint open
//! for as long as it lives. A supervisor task owns the socket, reconnects
//! after every drop using the [`ReconnectPolicy`], and delivers inbound
//! text frames to registered handlers in arrival order.
//!
//! # Supervisor Loop
//!
//! ```text
//! loop {
//!     Connecting ─► connect (bounded by connect_timeout)
//!     Open       ─► pump frames until drop / error / close
//!     Closed     ─► sleep delay_for_attempt(n), unless closed explicitly
//! }
//! ```
//!
//! Transport failures never reach the caller. They are logged and folded
//! into the `Closed` state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::channel::Message;
use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, Sequence, SubscriptionId};
use crate::listeners::ListenerSet;

use super::backoff::ReconnectPolicy;
use super::state::ConnectionState;

// ============================================================================
// Constants
// ============================================================================

/// Deadline for sending a close frame during teardown.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How an open session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Remote close, read/write error, or end of stream. Retried.
    Dropped,
    /// Explicit close. Not retried.
    Shutdown,
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves once a stop is requested or the sender is gone.
///
/// The watch guard is released before returning so callers may await
/// inside their `select!` arm.
pub(super) async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between the handle and the supervisor task.
struct Shared {
    /// Connection identifier for logs.
    id: ConnectionId,
    /// Target endpoint.
    endpoint: Url,
    /// Backoff and timing parameters.
    policy: ReconnectPolicy,
    /// Current lifecycle state.
    state_tx: watch::Sender<ConnectionState>,
    /// Inbound message handlers.
    message_handlers: ListenerSet<Message>,
    /// State change handlers.
    state_handlers: ListenerSet<ConnectionState>,
    /// Consecutive failed or short-lived attempts.
    retry_count: AtomicU32,
    /// Last scheduled retry delay in milliseconds.
    last_delay_ms: AtomicU64,
    /// Next inbound sequence position.
    next_seq: AtomicU64,
    /// Set once by [`ResilientConnection::close`].
    closed: AtomicBool,
}

impl Shared {
    /// Publishes a state transition.
    ///
    /// Watchers are always woken; handlers and logs only see real changes.
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(connection_id = %self.id, from = %previous, to = %state, "State changed");
            self.state_handlers.emit(&state);
        }
    }

    /// Assigns a sequence position and hands the payload to every handler.
    fn deliver(&self, text: &str) {
        let seq = Sequence::new(self.next_seq.fetch_add(1, Ordering::Relaxed));
        trace!(connection_id = %self.id, %seq, len = text.len(), "Inbound message");

        let message = Message::inbound(seq, text);
        self.message_handlers.emit(&message);
    }
}

// ============================================================================
// ResilientConnection
// ============================================================================

/// Self-healing WebSocket connection to a fixed endpoint.
///
/// Created with [`open`](Self::open), which starts connecting immediately.
/// The connection is torn down by [`close`](Self::close) or on drop.
///
/// # Example
///
/// ```ignore
/// use resilient_chat::{ReconnectPolicy, ResilientConnection};
///
/// let url = "ws://localhost:8080".parse()?;
/// let connection = ResilientConnection::open(url, ReconnectPolicy::default());
///
/// connection.on_message(|message| println!("{}", message.text()));
/// connection.send("hello");
/// ```
pub struct ResilientConnection {
    /// Shared with the supervisor task.
    shared: Arc<Shared>,
    /// Outbound payloads for the supervisor.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Stop signal for the supervisor.
    shutdown_tx: watch::Sender<bool>,
    /// Supervisor task handle.
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ResilientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientConnection")
            .field("id", &self.shared.id)
            .field("endpoint", &self.shared.endpoint.as_str())
            .field("state", &self.state())
            .field("retry_count", &self.retry_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ResilientConnection - Public API
// ============================================================================

impl ResilientConnection {
    /// Starts connecting to `endpoint`.
    ///
    /// Returns immediately. The outcome is observable through
    /// [`state`](Self::state), [`state_changes`](Self::state_changes) and
    /// [`on_state_change`](Self::on_state_change); failures only trigger
    /// the retry policy.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - `ws://` address to keep connected to
    /// * `policy` - Backoff and timing parameters
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn open(endpoint: Url, policy: ReconnectPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            id: ConnectionId::generate(),
            endpoint,
            policy,
            state_tx,
            message_handlers: ListenerSet::new(),
            state_handlers: ListenerSet::new(),
            retry_count: AtomicU32::new(0),
            last_delay_ms: AtomicU64::new(0),
            next_seq: AtomicU64::new(Sequence::FIRST.as_u64()),
            closed: AtomicBool::new(false),
        });

        info!(
            connection_id = %shared.id,
            endpoint = %shared.endpoint,
            "Opening resilient connection"
        );

        let task = tokio::spawn(Self::supervise(
            Arc::clone(&shared),
            outbound_rx,
            shutdown_rx,
        ));

        Self {
            shared,
            outbound_tx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Returns the target endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    /// Returns the reconnect policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.shared.policy
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Returns `true` if the transport is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Returns a receiver that observes every state transition.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Returns the number of consecutive failed or short-lived attempts.
    #[inline]
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.shared.retry_count.load(Ordering::Relaxed)
    }

    /// Returns the most recently scheduled retry delay.
    #[inline]
    #[must_use]
    pub fn last_delay(&self) -> Duration {
        Duration::from_millis(self.shared.last_delay_ms.load(Ordering::Relaxed))
    }

    /// Transmits `payload` if the transport is open.
    ///
    /// Fire-and-forget. When the connection is not open the payload is
    /// dropped; nothing is buffered across disconnects. Returns `true` if
    /// the payload was handed to the open transport.
    ///
    /// Callers are expected to reject empty payloads beforehand.
    pub fn send(&self, payload: &str) -> bool {
        if self.is_closed() {
            trace!(connection_id = %self.shared.id, "Send after close ignored");
            return false;
        }

        if !self.is_open() {
            debug!(
                connection_id = %self.shared.id,
                state = %self.state(),
                "Dropping outbound message while not open"
            );
            return false;
        }

        self.outbound_tx.send(payload.to_owned()).is_ok()
    }

    /// Registers a handler invoked once per inbound payload, in arrival order.
    pub fn on_message<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.message_handlers.add(Arc::new(handler))
    }

    /// Removes an inbound message handler.
    pub fn remove_handler(&self, id: SubscriptionId) -> bool {
        self.shared.message_handlers.remove(id)
    }

    /// Registers a handler invoked on every state transition.
    pub fn on_state_change<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.shared.state_handlers.add(Arc::new(handler))
    }

    /// Removes a state change handler.
    pub fn remove_state_handler(&self, id: SubscriptionId) -> bool {
        self.shared.state_handlers.remove(id)
    }

    /// Waits until the connection reaches `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closed
    /// explicitly and settles in `Closed` before reaching `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut changes = self.state_changes();

        let reached = changes
            .wait_for(|state| {
                *state == target
                    || (*state == ConnectionState::Closed && shared.closed.load(Ordering::Acquire))
            })
            .await
            .map(|state| *state == target)
            .map_err(|_| Error::ConnectionClosed)?;

        if reached {
            Ok(())
        } else {
            Err(Error::ConnectionClosed)
        }
    }

    /// Tears the connection down.
    ///
    /// Closes the open transport, cancels any pending retry timer, and
    /// discards queued outbound payloads. Only the first call has an
    /// effect; later calls (including the one from `Drop`) are no-ops.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(connection_id = %self.shared.id, "Closing resilient connection");

        self.shutdown_tx.send_replace(true);

        // The supervisor may already be gone if the runtime shut down.
        if let Some(task) = self.task.lock().take()
            && task.is_finished()
        {
            self.shared.set_state(ConnectionState::Closed);
        }
    }
}

// ============================================================================
// ResilientConnection - Supervisor
// ============================================================================

impl ResilientConnection {
    /// Connect / pump / back off until shut down.
    async fn supervise(
        shared: Arc<Shared>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            shared.set_state(ConnectionState::Connecting);

            let attempt = tokio::select! {
                biased;

                () = shutdown_requested(&mut shutdown_rx) => break,

                result = Self::connect(&shared) => result,
            };

            match attempt {
                Ok(ws_stream) => {
                    // Cleared before publishing Open so sends made by state
                    // watchers land in this session.
                    Self::discard_stale(&shared, &mut outbound_rx);

                    let opened_at = Instant::now();
                    shared.set_state(ConnectionState::Open);
                    info!(
                        connection_id = %shared.id,
                        endpoint = %shared.endpoint,
                        "Connection open"
                    );

                    let end =
                        Self::run_session(&shared, ws_stream, &mut outbound_rx, &mut shutdown_rx)
                            .await;

                    shared.set_state(ConnectionState::Closed);

                    if end == SessionEnd::Shutdown {
                        break;
                    }

                    let uptime = opened_at.elapsed();
                    if uptime >= shared.policy.min_uptime {
                        shared.retry_count.store(0, Ordering::Relaxed);
                    }
                    info!(
                        connection_id = %shared.id,
                        uptime_ms = uptime.as_millis() as u64,
                        "Connection dropped"
                    );
                }

                Err(e) => {
                    if e.is_connection_error() {
                        debug!(connection_id = %shared.id, error = %e, "Connect attempt failed");
                    } else {
                        warn!(connection_id = %shared.id, error = %e, "Connect attempt failed unexpectedly");
                    }
                    shared.set_state(ConnectionState::Closed);
                }
            }

            let attempt = shared.retry_count.fetch_add(1, Ordering::Relaxed) + 1;
            let delay = shared.policy.delay_for_attempt(attempt);
            shared
                .last_delay_ms
                .store(delay.as_millis() as u64, Ordering::Relaxed);

            debug!(
                connection_id = %shared.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnect scheduled"
            );

            tokio::select! {
                biased;

                () = shutdown_requested(&mut shutdown_rx) => break,

                () = sleep(delay) => {}
            }
        }

        shared.set_state(ConnectionState::Closed);
        debug!(connection_id = %shared.id, "Supervisor terminated");
    }

    /// Performs one handshake, bounded by the connect timeout.
    async fn connect(shared: &Shared) -> Result<WsStream> {
        let deadline = shared.policy.connect_timeout;

        trace!(connection_id = %shared.id, endpoint = %shared.endpoint, "Connecting");

        let (ws_stream, _response) = timeout(deadline, connect_async(shared.endpoint.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(deadline.as_millis() as u64))??;

        Ok(ws_stream)
    }

    /// Drops payloads left over from an earlier session.
    fn discard_stale(shared: &Shared, outbound_rx: &mut mpsc::UnboundedReceiver<String>) {
        let mut stale = 0usize;
        while outbound_rx.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(connection_id = %shared.id, count = stale, "Discarded stale outbound messages");
        }
    }

    /// Pumps frames on an open transport until it ends.
    async fn run_session(
        shared: &Shared,
        ws_stream: WsStream,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;

                () = shutdown_requested(shutdown_rx) => {
                    debug!(connection_id = %shared.id, "Shutdown requested");
                    let _ = timeout(CLOSE_FRAME_TIMEOUT, ws_write.close()).await;
                    return SessionEnd::Shutdown;
                }

                message = ws_read.next() => {
                    match message {
                        Some(Ok(WsMessage::Text(text))) => {
                            shared.deliver(text.as_str());
                        }

                        Some(Ok(WsMessage::Close(frame))) => {
                            debug!(connection_id = %shared.id, ?frame, "WebSocket closed by remote");
                            return SessionEnd::Dropped;
                        }

                        Some(Err(e)) => {
                            warn!(connection_id = %shared.id, error = %e, "WebSocket error");
                            return SessionEnd::Dropped;
                        }

                        None => {
                            debug!(connection_id = %shared.id, "WebSocket stream ended");
                            return SessionEnd::Dropped;
                        }

                        // Ignore Binary, Ping, Pong
                        Some(Ok(_)) => {}
                    }
                }

                payload = outbound_rx.recv() => {
                    match payload {
                        Some(payload) => {
                            if let Err(e) = ws_write.send(WsMessage::Text(payload.into())).await {
                                warn!(connection_id = %shared.id, error = %e, "Failed to send message");
                                return SessionEnd::Dropped;
                            }
                            trace!(connection_id = %shared.id, "Outbound message sent");
                        }

                        None => {
                            debug!(connection_id = %shared.id, "Outbound channel closed");
                            let _ = timeout(CLOSE_FRAME_TIMEOUT, ws_write.close()).await;
                            return SessionEnd::Shutdown;
                        }
                    }
                }
            }
        }
    }
}

impl Drop for ResilientConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, TcpListener as StdTcpListener};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{OnceLock, Weak};

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use crate::transport::server::BroadcastServer;

    /// Endpoint on a local port with nothing listening.
    fn unreachable_endpoint() -> Url {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        Url::parse(&format!("ws://127.0.0.1:{port}")).expect("valid url")
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy::new()
            .with_initial_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(40))
            .with_growth_factor(2.0)
            .with_connect_timeout(Duration::from_millis(500))
    }

    async fn start_server() -> BroadcastServer {
        BroadcastServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed")
    }

    /// Polls `condition` every 10ms for up to 5s.
    async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }

    /// Server that completes the WebSocket upgrade, holds the socket for
    /// `hold`, then drops it. Returns the endpoint and an accept counter.
    async fn flaky_server(hold: Duration) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    if let Ok(ws_stream) = accept_async(stream).await {
                        counter.fetch_add(1, Ordering::SeqCst);
                        sleep(hold).await;
                        drop(ws_stream);
                    }
                });
            }
        });

        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("valid url");
        (url, accepted)
    }

    #[test]
    fn test_constants() {
        assert_eq!(CLOSE_FRAME_TIMEOUT.as_secs(), 1);
    }

    #[tokio::test]
    async fn test_starts_connecting() {
        let connection = ResilientConnection::open(unreachable_endpoint(), fast_policy());
        assert_ne!(connection.state(), ConnectionState::Open);
        assert!(!connection.is_closed());
        connection.close();
    }

    #[tokio::test]
    async fn test_send_while_not_open_is_dropped() {
        let connection = ResilientConnection::open(unreachable_endpoint(), fast_policy());
        assert!(!connection.send("lost"));
        connection.close();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_keeps_retrying() {
        let connection = ResilientConnection::open(unreachable_endpoint(), fast_policy());

        sleep(Duration::from_millis(300)).await;

        assert!(connection.retry_count() >= 2);
        assert!(connection.last_delay() <= Duration::from_millis(40));
        assert!(!connection.is_open());
        connection.close();
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let connection = ResilientConnection::open(unreachable_endpoint(), fast_policy());

        connection.close();
        connection.close();

        timeout(
            Duration::from_secs(2),
            connection.wait_for_state(ConnectionState::Closed),
        )
        .await
        .expect("should settle in Closed")
        .expect("waiting for Closed succeeds");

        let retries = connection.retry_count();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(connection.retry_count(), retries);
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(!connection.send("after close"));
    }

    #[tokio::test]
    async fn test_wait_for_open_fails_after_close() {
        let connection = ResilientConnection::open(unreachable_endpoint(), fast_policy());
        connection.close();

        let result = timeout(
            Duration::from_secs(2),
            connection.wait_for_state(ConnectionState::Open),
        )
        .await
        .expect("should not hang");

        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_handlers_can_be_removed() {
        let connection = ResilientConnection::open(unreachable_endpoint(), fast_policy());

        let id = connection.on_message(|_| {});
        assert!(connection.remove_handler(id));
        assert!(!connection.remove_handler(id));

        let id = connection.on_state_change(|_| {});
        assert!(connection.remove_state_handler(id));
        connection.close();
    }

    #[tokio::test]
    async fn test_send_from_open_handler_is_delivered() {
        let server = start_server().await;
        let url = Url::parse(&server.ws_url()).expect("valid url");

        let connection = Arc::new(ResilientConnection::open(url, fast_policy()));
        let slot: Arc<OnceLock<Weak<ResilientConnection>>> = Arc::new(OnceLock::new());
        let accepted = Arc::new(AtomicBool::new(false));

        let handle = Arc::clone(&slot);
        let flag = Arc::clone(&accepted);
        connection.on_state_change(move |state| {
            if state.is_open()
                && let Some(connection) = handle.get().and_then(Weak::upgrade)
            {
                flag.store(connection.send("greeting"), Ordering::SeqCst);
            }
        });
        let _ = slot.set(Arc::downgrade(&connection));

        assert!(eventually(|| accepted.load(Ordering::SeqCst)).await);
        assert!(eventually(|| server.received_count() == 1).await);
        assert_eq!(server.history(), vec!["greeting".to_string()]);

        connection.close();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_send_right_after_open_is_delivered() {
        let server = start_server().await;

        for round in 0..10 {
            let url = Url::parse(&server.ws_url()).expect("valid url");
            let connection = ResilientConnection::open(url, fast_policy());

            timeout(
                Duration::from_secs(5),
                connection.wait_for_state(ConnectionState::Open),
            )
            .await
            .expect("should open in time")
            .expect("not closed");

            assert!(connection.send(&format!("round-{round}")));
            assert!(eventually(|| server.received_count() == round + 1).await);

            connection.close();
        }

        let expected: Vec<String> = (0..10).map(|round| format!("round-{round}")).collect();
        assert_eq!(server.history(), expected);
    }

    #[tokio::test]
    async fn test_handshake_timeout_counts_as_failure() {
        // Accepts at the TCP level but never answers the upgrade.
        let silent = StdTcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = silent.local_addr().expect("local addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("valid url");

        let policy = fast_policy().with_connect_timeout(Duration::from_millis(100));
        let connection = ResilientConnection::open(url, policy);

        let opened = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&opened);
        connection.on_state_change(move |state| {
            if state.is_open() {
                flag.store(true, Ordering::SeqCst);
            }
        });

        assert!(eventually(|| connection.retry_count() >= 3).await);
        assert!(!opened.load(Ordering::SeqCst));
        assert!(!connection.is_open());

        connection.close();
        drop(silent);
    }

    #[tokio::test]
    async fn test_short_sessions_keep_backing_off() {
        let (url, accepted) = flaky_server(Duration::ZERO).await;
        let policy = fast_policy().with_min_uptime(Duration::from_secs(10));
        let connection = ResilientConnection::open(url, policy);

        assert!(eventually(|| accepted.load(Ordering::SeqCst) >= 4).await);
        assert!(eventually(|| connection.retry_count() >= 3).await);

        connection.close();
    }

    #[tokio::test]
    async fn test_retry_count_resets_after_min_uptime() {
        let (url, accepted) = flaky_server(Duration::from_millis(50)).await;
        let policy = fast_policy().with_min_uptime(Duration::from_millis(20));
        let connection = ResilientConnection::open(url, policy);

        assert!(eventually(|| accepted.load(Ordering::SeqCst) >= 4).await);
        assert!(connection.retry_count() <= 1);
        assert_eq!(connection.last_delay(), Duration::from_millis(10));

        connection.close();
    }
}

//! WebSocket broadcast server.
//!
//! The remote end of the chat: every text frame received from any client is
//! appended to a shared history and rebroadcast to all connected clients,
//! the sender included.
//!
//! # Connection Flow
//!
//! 1. [`BroadcastServer::bind`] binds a TCP listener (port 0 picks a free
//!    port) and spawns the accept loop
//! 2. Each accepted socket is upgraded to WebSocket and gets its own task
//! 3. The client task pumps inbound frames into the broadcast channel and
//!    forwards broadcast frames back to its socket
//! 4. [`BroadcastServer::shutdown`] (or drop) stops accepting and ends
//!    every client session

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, trace, warn};

use crate::error::Result;

use super::connection::shutdown_requested;

// ============================================================================
// Constants
// ============================================================================

/// Frames buffered per client before it starts lagging.
const BROADCAST_CAPACITY: usize = 100;

/// Deadline for sending a close frame during shutdown.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// ServerShared
// ============================================================================

/// State shared by the accept loop and client tasks.
struct ServerShared {
    /// Fan-out of received frames to every client.
    broadcast_tx: broadcast::Sender<String>,
    /// Every text frame received, in arrival order.
    history: Mutex<Vec<String>>,
    /// Clients currently connected.
    active: AtomicUsize,
    /// Bumped to drop every connected client.
    kick_tx: watch::Sender<u64>,
    /// Set to stop the server.
    shutdown_tx: watch::Sender<bool>,
}

impl ServerShared {
    /// Records a frame and rebroadcasts it.
    fn publish(&self, text: &str) {
        self.history.lock().push(text.to_owned());

        match self.broadcast_tx.send(text.to_owned()) {
            Ok(receivers) => trace!(receivers, "Frame broadcast"),
            Err(_) => debug!("Frame not broadcast: no connected clients"),
        }
    }
}

// ============================================================================
// BroadcastServer
// ============================================================================

/// A running WebSocket server that echoes every frame to every client.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use resilient_chat::BroadcastServer;
///
/// let server = BroadcastServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("listening on {}", server.ws_url());
/// ```
pub struct BroadcastServer {
    /// Bound address.
    local_addr: SocketAddr,
    /// Shared with the accept loop and client tasks.
    shared: Arc<ServerShared>,
}

impl fmt::Debug for BroadcastServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastServer")
            .field("local_addr", &self.local_addr)
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BroadcastServer - Constructors
// ============================================================================

impl BroadcastServer {
    /// Binds to `ip:port` and starts accepting clients.
    ///
    /// Use port 0 to let the OS assign a free port.
    ///
    /// # Arguments
    ///
    /// * `ip` - IP address to bind to (typically localhost)
    /// * `port` - Port to bind to (0 for random)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        Self::bind_addr(SocketAddr::new(ip, port)).await
    }

    /// Binds to any address tokio can resolve and starts accepting clients.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind to, e.g. `"127.0.0.1:8080"`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if resolution or binding fails.
    pub async fn bind_addr<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (kick_tx, _) = watch::channel(0u64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(ServerShared {
            broadcast_tx,
            history: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            kick_tx,
            shutdown_tx,
        });

        tokio::spawn(Self::accept_loop(
            Arc::clone(&shared),
            listener,
            shutdown_rx,
        ));

        info!(%local_addr, "Broadcast server listening");

        Ok(Self { local_addr, shared })
    }
}

// ============================================================================
// BroadcastServer - Public API
// ============================================================================

impl BroadcastServer {
    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL clients should connect to.
    ///
    /// Format: `ws://{ip}:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Returns the number of connected clients.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Returns every text frame received so far, in arrival order.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.shared.history.lock().clone()
    }

    /// Returns the number of text frames received so far.
    #[inline]
    #[must_use]
    pub fn received_count(&self) -> usize {
        self.shared.history.lock().len()
    }

    /// Drops every connected client without a close handshake.
    ///
    /// The listener keeps accepting, so clients may reconnect.
    pub fn drop_clients(&self) {
        info!(
            clients = self.connection_count(),
            "Dropping all clients"
        );
        self.shared.kick_tx.send_modify(|generation| *generation += 1);
    }

    /// Stops accepting and ends every client session.
    ///
    /// Also called on drop. Safe to call more than once.
    pub fn shutdown(&self) {
        if self.shared.shutdown_tx.send_replace(true) {
            return;
        }
        info!(local_addr = %self.local_addr, "Broadcast server shutting down");
    }
}

// ============================================================================
// BroadcastServer - Tasks
// ============================================================================

impl BroadcastServer {
    /// Accepts clients until shut down.
    async fn accept_loop(
        shared: Arc<ServerShared>,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;

                () = shutdown_requested(&mut shutdown_rx) => break,

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!(%addr, "TCP connection accepted");
                            tokio::spawn(Self::serve_client(Arc::clone(&shared), stream, addr));
                        }
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                        }
                    }
                }
            }
        }

        debug!("Accept loop terminated");
    }

    /// Serves one client until it leaves, is dropped, or the server stops.
    async fn serve_client(shared: Arc<ServerShared>, stream: TcpStream, addr: SocketAddr) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%addr, error = %e, "WebSocket handshake failed");
                return;
            }
        };

        // Subscribe before counting the client so a visible client never
        // misses a broadcast.
        let mut broadcast_rx = shared.broadcast_tx.subscribe();
        let mut kick_rx = shared.kick_tx.subscribe();
        let mut shutdown_rx = shared.shutdown_tx.subscribe();

        let active = shared.active.fetch_add(1, Ordering::AcqRel) + 1;
        info!(%addr, active, "Client connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;

                () = shutdown_requested(&mut shutdown_rx) => {
                    let _ = timeout(CLOSE_FRAME_TIMEOUT, ws_write.close()).await;
                    break;
                }

                _ = kick_rx.changed() => {
                    debug!(%addr, "Client dropped");
                    break;
                }

                incoming = ws_read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            shared.publish(text.as_str());
                        }

                        Some(Ok(WsMessage::Close(_))) | None => {
                            debug!(%addr, "Client closed connection");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(%addr, error = %e, "Error receiving message");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        Some(Ok(_)) => {}
                    }
                }

                outgoing = broadcast_rx.recv() => {
                    match outgoing {
                        Ok(text) => {
                            if ws_write.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }

                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%addr, skipped, "Client lagged behind broadcast");
                        }

                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        let active = shared.active.fetch_sub(1, Ordering::AcqRel) - 1;
        info!(%addr, active, "Client disconnected");
    }
}

impl Drop for BroadcastServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

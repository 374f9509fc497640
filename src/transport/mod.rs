//! Transport layer (pub/sub link to the robot)
//!
//! Note: all trait methods take `&self` (not `&mut self`) to support
//! `Arc<dyn Transport>`. Implementations use interior mutability for their
//! connection state.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Connection state of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Callback type for connection status changes
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no live session")]
    NotConnected,
    #[error("session establishment timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A publish/subscribe session to the robot.
///
/// Publishes are fire-and-forget: no acknowledgment, no retry, no
/// backpressure accounting. At most one live session exists per transport;
/// `reconnect` tears the old one down before establishing a new one.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for diagnostics
    fn name(&self) -> &str;

    /// Establish a session. Moves status Disconnected -> Connecting ->
    /// Connected, or back to Disconnected on failure.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Tear down any existing session (idempotent on closed sessions) and
    /// establish a new one.
    async fn reconnect(&self) -> Result<(), TransportError>;

    /// Publish a payload on a topic through the current session.
    ///
    /// Returns [`TransportError::NotConnected`] when no session is live;
    /// callers on the tick path treat that as a diagnostic, not a failure.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    /// Current connection status
    fn status(&self) -> ConnectionStatus;

    /// Subscribe to connection status changes
    fn subscribe_status(&self, callback: StatusCallback);

    /// Close the session and stop background tasks.
    async fn shutdown(&self);
}

pub mod console;
pub mod ws;

pub use console::ConsoleTransport;
pub use ws::WsTransport;

//! WebSocket transport.
//!
//! Wraps a single websocket session to the broker. Publishes are JSON
//! frames `{"topic": ..., "payload": ...}`; a background reader task watches
//! the stream and flips the status to disconnected when the peer closes or
//! errors. Only this module creates or closes the session; everything else
//! reads the current handle through [`Transport`].

use super::{ConnectionStatus, StatusCallback, Transport, TransportError};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// WebSocket pub/sub transport to the broker.
pub struct WsTransport {
    url: String,
    connect_timeout: Duration,
    writer: Arc<Mutex<Option<WsSink>>>,
    status: Arc<RwLock<ConnectionStatus>>,
    status_callbacks: Arc<RwLock<Vec<StatusCallback>>>,
    /// Bumped on every teardown so a stale reader task cannot flip the
    /// status of a newer session
    generation: Arc<AtomicU64>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            writer: Arc::new(Mutex::new(None)),
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            status_callbacks: Arc::new(RwLock::new(Vec::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn emit_status(&self, status: ConnectionStatus) {
        *self.status.write() = status;
        for callback in self.status_callbacks.read().iter() {
            callback(status);
        }
    }

    /// Close the current session, if any. Idempotent.
    async fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut guard = self.writer.lock().await;
        if let Some(mut sink) = guard.take() {
            // Best-effort close; the peer may already be gone
            let _ = sink.close().await;
            debug!("Closed previous broker session");
        }
        drop(guard);

        self.emit_status(ConnectionStatus::Disconnected);
    }

    fn spawn_reader(
        &self,
        mut stream: futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
        generation: u64,
    ) {
        let writer = Arc::clone(&self.writer);
        let status = Arc::clone(&self.status);
        let status_callbacks = Arc::clone(&self.status_callbacks);
        let current_generation = Arc::clone(&self.generation);

        tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(msg)) => {
                        // The gateway publishes only; inbound traffic is
                        // logged and dropped
                        debug!("Inbound broker message ignored: {:?}", msg);
                    }
                    Some(Err(e)) => {
                        warn!("Broker session error: {}", e);
                        break;
                    }
                }
            }

            // A newer session may already be live; only the current
            // generation reports the drop
            if current_generation.load(Ordering::SeqCst) != generation {
                return;
            }

            warn!("🔌 Broker session closed");
            writer.lock().await.take();

            *status.write() = ConnectionStatus::Disconnected;
            for callback in status_callbacks.read().iter() {
                callback(ConnectionStatus::Disconnected);
            }
        });
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn connect(&self) -> Result<(), TransportError> {
        info!("🔌 Connecting to broker at {}", self.url);
        self.emit_status(ConnectionStatus::Connecting);

        let connected =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await;

        let (stream, _response) = match connected {
            Err(_) => {
                self.emit_status(ConnectionStatus::Disconnected);
                return Err(TransportError::ConnectTimeout(self.connect_timeout));
            }
            Ok(Err(e)) => {
                self.emit_status(ConnectionStatus::Disconnected);
                return Err(e.into());
            }
            Ok(Ok(ok)) => ok,
        };

        let (sink, source) = stream.split();
        *self.writer.lock().await = Some(sink);

        let generation = self.generation.load(Ordering::SeqCst);
        self.spawn_reader(source, generation);

        self.emit_status(ConnectionStatus::Connected);
        info!("✅ Broker session established");
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        self.teardown().await;
        self.connect().await
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let frame = serde_json::json!({
            "topic": topic,
            "payload": payload,
        })
        .to_string();

        if let Err(e) = sink.send(Message::Text(frame)).await {
            // The session is gone; drop the handle so the next publish
            // reports NotConnected instead of retrying a dead sink
            guard.take();
            drop(guard);
            self.emit_status(ConnectionStatus::Disconnected);
            return Err(e.into());
        }

        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    fn subscribe_status(&self, callback: StatusCallback) {
        self.status_callbacks.write().push(callback);
    }

    async fn shutdown(&self) {
        self.teardown().await;
        info!("🛑 Broker transport shut down");
    }
}

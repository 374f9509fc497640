//! Console transport - logs all publishes for dry runs and testing
//!
//! Useful for:
//! - Exercising the whole pipeline without a broker (`--dry-run`)
//! - Observing the exact wire payloads during development
//! - Tests that need to count or inspect publishes

use super::{ConnectionStatus, StatusCallback, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Transport that logs publishes instead of sending them.
pub struct ConsoleTransport {
    connected: RwLock<ConnectionStatus>,
    status_callbacks: RwLock<Vec<StatusCallback>>,
    published: Arc<RwLock<Vec<(String, String)>>>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            connected: RwLock::new(ConnectionStatus::Disconnected),
            status_callbacks: RwLock::new(Vec::new()),
            published: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Everything published so far, as (topic, payload) pairs.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.read().clone()
    }

    /// Number of publish calls that went through.
    pub fn publish_count(&self) -> usize {
        self.published.read().len()
    }

    fn emit_status(&self, status: ConnectionStatus) {
        *self.connected.write() = status;
        for callback in self.status_callbacks.read().iter() {
            callback(status);
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn connect(&self) -> Result<(), TransportError> {
        self.emit_status(ConnectionStatus::Connected);
        info!("✅ Console transport ready (publishes are logged, not sent)");
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        self.connect().await
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        if !self.connected.read().is_connected() {
            return Err(TransportError::NotConnected);
        }

        info!(
            "📤 [{}] {} ← {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            topic,
            payload
        );

        self.published
            .write()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        *self.connected.read()
    }

    fn subscribe_status(&self, callback: StatusCallback) {
        self.status_callbacks.write().push(callback);
    }

    async fn shutdown(&self) {
        self.emit_status(ConnectionStatus::Disconnected);
    }
}

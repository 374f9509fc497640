//! Change-suppressed command transmission.
//!
//! Each control tick the current actual velocity is serialized and compared
//! byte-for-byte against the last sent payload; identical payloads are not
//! re-published. The tick-based resend-on-change model is the only implicit
//! retry in the system.

use crate::control::command::VelocityCommand;
use crate::transport::{Transport, TransportError};
use tracing::{debug, warn};

/// Serializes and publishes velocity commands with change suppression.
pub struct CommandTransmitter {
    topic: String,
    invert_linear: bool,
    invert_angular: bool,
    last_sent: Option<String>,
}

impl CommandTransmitter {
    pub fn new(topic: impl Into<String>, invert_linear: bool, invert_angular: bool) -> Self {
        Self {
            topic: topic.into(),
            invert_linear,
            invert_angular,
            last_sent: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn invert_linear(&self) -> bool {
        self.invert_linear
    }

    pub fn invert_angular(&self) -> bool {
        self.invert_angular
    }

    /// Toggle linear axis inversion, returning the new setting.
    pub fn toggle_invert_linear(&mut self) -> bool {
        self.invert_linear = !self.invert_linear;
        self.invert_linear
    }

    /// Toggle angular axis inversion, returning the new setting.
    pub fn toggle_invert_angular(&mut self) -> bool {
        self.invert_angular = !self.invert_angular;
        self.invert_angular
    }

    /// Forget the last sent payload so the next tick publishes
    /// unconditionally (used after a reconnect).
    pub fn reset(&mut self) {
        self.last_sent = None;
    }

    /// Serialize the command and publish it if it differs from the last
    /// sent payload.
    ///
    /// Returns the serialized payload when it was transmitted (for the
    /// recording buffer), or `None` when suppressed as unchanged. A missing
    /// session downgrades to a diagnostic; the tick loop never fails.
    pub async fn transmit(
        &mut self,
        command: VelocityCommand,
        transport: &dyn Transport,
    ) -> Option<String> {
        let command = VelocityCommand {
            linear: apply_sign(command.linear, self.invert_linear),
            angular: apply_sign(command.angular, self.invert_angular),
            heading: command.heading,
        };

        let payload = command.to_wire();
        if self.last_sent.as_deref() == Some(payload.as_str()) {
            return None;
        }
        self.last_sent = Some(payload.clone());

        self.publish(&payload, transport).await;
        Some(payload)
    }

    /// Publish a raw payload immediately, bypassing the ramp and change
    /// detection (legacy discrete commands).
    pub async fn send_raw(&mut self, payload: &str, transport: &dyn Transport) {
        self.last_sent = Some(payload.to_string());
        self.publish(payload, transport).await;
    }

    async fn publish(&self, payload: &str, transport: &dyn Transport) {
        debug!("📤 {} ← {}", self.topic, payload);
        match transport.publish(&self.topic, payload).await {
            Ok(()) => {}
            Err(TransportError::NotConnected) => {
                warn!("No broker session, command dropped: {}", payload);
            }
            Err(e) => {
                warn!("Publish failed: {}", e);
            }
        }
    }
}

/// Apply axis inversion, normalizing negative zero so inverted rest input
/// serializes identically to non-inverted rest input.
fn apply_sign(value: f64, invert: bool) -> f64 {
    let value = if invert { -value } else { value };
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

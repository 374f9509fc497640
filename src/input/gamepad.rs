//! Gamepad input source.
//!
//! Runs the gilrs poll loop on a dedicated blocking thread (gilrs is not
//! Send-safe) and bridges stick deflections to the async world over an
//! unbounded channel. The left stick drives the robot: stick up is forward,
//! stick left turns left. The east button is a hardware emergency stop.

use crate::input::normalize::{apply_stick_deadzone, NormalizedInput};
use anyhow::Result;
use gilrs::{Axis, Button, EventType, Gilrs};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Event emitted by the gamepad source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Left stick deflection, normalized to the unit disc in the control
    /// surface convention (y positive is down/backward).
    Stick(NormalizedInput),
    /// Emergency stop button pressed.
    Zero,
}

/// Handle to a running gamepad source.
pub struct GamepadSource {
    shutdown_tx: mpsc::Sender<()>,
}

impl GamepadSource {
    /// Start polling gamepads on a dedicated thread.
    ///
    /// Returns the source handle and the receiving end of the event stream.
    pub fn start(deadzone: f64) -> Result<(Self, mpsc::UnboundedReceiver<InputEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<InputEvent>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        std::thread::spawn(move || {
            Self::event_loop_blocking(deadzone, event_tx, shutdown_rx);
        });

        Ok((Self { shutdown_tx }, event_rx))
    }

    /// Signal the poll thread to exit.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    /// Main poll loop (runs in a dedicated blocking thread)
    fn event_loop_blocking(
        deadzone: f64,
        event_tx: mpsc::UnboundedSender<InputEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        // Initialize gilrs in this thread (not Send-safe)
        let mut gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("🎮 Gamepad backend initialized");
                g
            }
            Err(e) => {
                warn!("Failed to initialize gamepad backend: {:?}", e);
                return;
            }
        };

        for (_id, pad) in gilrs.gamepads() {
            info!("🎮 Gamepad detected: {}", pad.name());
        }

        // Raw left-stick state per gamepad
        let mut sticks: HashMap<gilrs::GamepadId, (f64, f64)> = HashMap::new();

        loop {
            if shutdown_rx.try_recv().is_ok() {
                debug!("Gamepad poll loop shutting down");
                break;
            }

            while let Some(event) = gilrs.next_event() {
                match event.event {
                    EventType::AxisChanged(axis, value, _) => {
                        let entry = sticks.entry(event.id).or_insert((0.0, 0.0));
                        match axis {
                            Axis::LeftStickX => entry.0 = value as f64,
                            // gilrs reports stick up as positive; the control
                            // surface convention is y positive down
                            Axis::LeftStickY => entry.1 = -(value as f64),
                            _ => continue,
                        }

                        let (x, y) = *entry;
                        let input = apply_stick_deadzone(x, y, deadzone);
                        if event_tx.send(InputEvent::Stick(input)).is_err() {
                            return;
                        }
                    }
                    EventType::ButtonPressed(Button::East, _) => {
                        debug!("Emergency stop button pressed");
                        if event_tx.send(InputEvent::Zero).is_err() {
                            return;
                        }
                    }
                    EventType::Connected => {
                        info!("🎮 Gamepad connected: {:?}", event.id);
                    }
                    EventType::Disconnected => {
                        info!("🎮 Gamepad disconnected: {:?}", event.id);
                        sticks.remove(&event.id);
                        // Treat a vanished pad as released input
                        if event_tx.send(InputEvent::Stick(NormalizedInput::ZERO)).is_err() {
                            return;
                        }
                    }
                    _ => {}
                }
            }

            std::thread::sleep(Duration::from_millis(4));
        }
    }
}

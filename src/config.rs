//! Configuration management for Teleop GW
//!
//! Handles loading and parsing of the YAML configuration file. All tunables
//! that drifted across the original controller variants (velocity bounds,
//! ramp rates, tick interval, invert conventions, curve exponent) live here
//! as one explicit structure.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub gamepad: GamepadConfig,
}

/// Pub/sub broker endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Topic the robot subscribes to for drive commands
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Session establishment timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Velocity bounds and ramp tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriveConfig {
    /// Maximum linear velocity magnitude (m/s)
    #[serde(default = "default_max_linear")]
    pub max_linear_velocity: f64,
    /// Maximum angular velocity magnitude (rad/s)
    #[serde(default = "default_max_angular")]
    pub max_angular_velocity: f64,
    /// Velocity change per second when ramping up
    #[serde(default = "default_accel")]
    pub accel: f64,
    /// Velocity change per second when ramping down
    #[serde(default = "default_decel")]
    pub decel: f64,
    /// Control tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub invert_linear: bool,
    #[serde(default)]
    pub invert_angular: bool,
}

/// Input shaping configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// Response curve exponent. 2.0 compresses sensitivity near center
    /// while preserving full range at the extremes.
    #[serde(default = "default_curve_exponent")]
    pub curve_exponent: f64,
    /// Target velocity change per key press, linear axis
    #[serde(default = "default_linear_step")]
    pub linear_step: f64,
    /// Target velocity change per key press, angular axis
    #[serde(default = "default_angular_step")]
    pub angular_step: f64,
}

/// Gamepad configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GamepadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Radial stick deadzone in normalized units
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the built-in defaults so the gateway can run
    /// without any on-disk configuration.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Broker websocket URL
    pub fn broker_url(&self) -> String {
        format!("ws://{}:{}", self.broker.host, self.broker.port)
    }

    /// Control tick period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.drive.tick_ms)
    }

    /// Session establishment timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.broker.connect_timeout_ms)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            topic: default_topic(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_linear_velocity: default_max_linear(),
            max_angular_velocity: default_max_angular(),
            accel: default_accel(),
            decel: default_decel(),
            tick_ms: default_tick_ms(),
            invert_linear: false,
            invert_angular: false,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            curve_exponent: default_curve_exponent(),
            linear_step: default_linear_step(),
            angular_step: default_angular_step(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deadzone: default_deadzone(),
        }
    }
}

fn default_broker_host() -> String {
    "bracketbot.local".to_string()
}

fn default_broker_port() -> u16 {
    9001
}

fn default_topic() -> String {
    "robot/drive".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_max_linear() -> f64 {
    3.0
}

fn default_max_angular() -> f64 {
    2.0
}

fn default_accel() -> f64 {
    10.0
}

fn default_decel() -> f64 {
    10.0
}

fn default_tick_ms() -> u64 {
    100
}

fn default_curve_exponent() -> f64 {
    2.0
}

fn default_linear_step() -> f64 {
    0.2
}

fn default_angular_step() -> f64 {
    0.1
}

fn default_deadzone() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

//! Drive command wire types.
//!
//! The robot accepts two payload shapes on the drive topic: the canonical
//! JSON velocity object, and bare legacy command strings kept for older
//! robot-side daemons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A velocity command as published on the wire.
///
/// Created fresh each control tick; never mutated in place. The optional
/// heading is populated only when robot-reported heading is being fed back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    #[serde(rename = "linear_velocity")]
    pub linear: f64,
    #[serde(rename = "angular_velocity")]
    pub angular: f64,
    #[serde(rename = "heading", skip_serializing_if = "Option::is_none", default)]
    pub heading: Option<f64>,
}

impl VelocityCommand {
    pub fn new(linear: f64, angular: f64) -> Self {
        Self {
            linear,
            angular,
            heading: None,
        }
    }

    /// Bound both axes to the configured maxima.
    pub fn clamped(self, max_linear: f64, max_angular: f64) -> Self {
        Self {
            linear: self.linear.clamp(-max_linear.abs(), max_linear.abs()),
            angular: self.angular.clamp(-max_angular.abs(), max_angular.abs()),
            heading: self.heading,
        }
    }

    /// Serialize to the canonical wire payload.
    pub fn to_wire(&self) -> String {
        // Serialization of a two-field f64 struct cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Legacy discrete command strings accepted by older robot daemons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl LegacyCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyCommand::Forward => "forward",
            LegacyCommand::Backward => "backward",
            LegacyCommand::Left => "left",
            LegacyCommand::Right => "right",
            LegacyCommand::Stop => "stop",
        }
    }
}

impl fmt::Display for LegacyCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegacyCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(LegacyCommand::Forward),
            "backward" => Ok(LegacyCommand::Backward),
            "left" => Ok(LegacyCommand::Left),
            "right" => Ok(LegacyCommand::Right),
            "stop" => Ok(LegacyCommand::Stop),
            _ => Err(()),
        }
    }
}

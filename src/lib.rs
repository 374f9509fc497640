//! Teleop GW - robot teleoperation gateway
//!
//! Translates operator input (gamepad stick, slider proxies, discrete key
//! commands) into bounded, acceleration-limited velocity commands published
//! to a robot over a pub/sub link at a fixed control cadence.

pub mod cli;
pub mod config;
pub mod control;
pub mod input;
pub mod playback;
pub mod transport;

//! The velocity command pipeline
//!
//! Target velocities derived from operator input are rate-limited by the
//! ramp, serialized to the canonical wire format, and transmitted on a fixed
//! control tick with change suppression.

pub mod command;
pub mod ramp;
pub mod session;
pub mod transmitter;

pub use command::{LegacyCommand, VelocityCommand};
pub use ramp::VelocityRamp;
pub use session::{ControlSession, SessionMode};
pub use transmitter::CommandTransmitter;

//! Operator input processing
//!
//! Converts raw input modalities (gamepad stick, slider proxies, discrete
//! key commands) into normalized values the control pipeline consumes.

pub mod curve;
pub mod gamepad;
pub mod keys;
pub mod normalize;

pub use keys::KeyCommand;
pub use normalize::NormalizedInput;

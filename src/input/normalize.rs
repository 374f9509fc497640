//! Shared normalization for drag and stick input.
//!
//! This module provides the canonical normalization of a 2D deflection
//! relative to a fixed-radius control surface, ensuring consistent behavior
//! whether the deflection comes from a pointer drag or a physical stick.
//!
//! # Radial clamping
//!
//! Deflections are clamped to the surface radius by magnitude, preserving
//! the deflection angle. This keeps diagonal input directions intact while
//! bounding both axes to [-1.0, 1.0] after division by the radius.

/// A deflection normalized to the unit disc.
///
/// `x` is lateral (positive right), `y` is longitudinal (positive down,
/// matching the drag coordinate convention of the control surface).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedInput {
    pub x: f64,
    pub y: f64,
}

impl NormalizedInput {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Deflection magnitude, capped at 1.0.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt().min(1.0)
    }
}

/// Normalize a raw drag delta against a control surface of the given radius.
///
/// The delta is clamped to length <= `radius` preserving its angle, then
/// divided by `radius` so each axis lands in [-1.0, 1.0].
///
/// A non-positive radius yields zero deflection rather than a division by
/// zero.
///
/// # Example
/// ```
/// use teleop_gw::input::normalize::normalize_drag;
///
/// let input = normalize_drag(110.0, 0.0, 110.0);
/// assert!((input.x - 1.0).abs() < 1e-9);
/// assert_eq!(input.y, 0.0);
///
/// // Over-travel is clamped, angle preserved
/// let input = normalize_drag(300.0, 300.0, 110.0);
/// assert!((input.magnitude() - 1.0).abs() < 1e-9);
/// assert!((input.x - input.y).abs() < 1e-9);
/// ```
pub fn normalize_drag(dx: f64, dy: f64, radius: f64) -> NormalizedInput {
    if radius <= 0.0 {
        return NormalizedInput::ZERO;
    }

    let distance = (dx * dx + dy * dy).sqrt();
    let (dx, dy) = if distance > radius {
        // Clamp to the surface edge preserving angle
        let angle = dy.atan2(dx);
        (angle.cos() * radius, angle.sin() * radius)
    } else {
        (dx, dy)
    };

    NormalizedInput {
        x: dx / radius,
        y: dy / radius,
    }
}

/// Apply a radial deadzone to an already-normalized stick deflection.
///
/// Uses a circular deadzone rather than a per-axis one so diagonal
/// directions respond the same as cardinals. The remaining range
/// [deadzone, 1.0] is rescaled to [0.0, 1.0], so motion just outside the
/// deadzone starts from zero instead of jumping.
pub fn apply_stick_deadzone(x: f64, y: f64, deadzone: f64) -> NormalizedInput {
    let magnitude = (x * x + y * y).sqrt();

    if magnitude <= deadzone {
        return NormalizedInput::ZERO;
    }
    if deadzone >= 1.0 {
        return NormalizedInput::ZERO;
    }

    let rescaled = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
    let scale = rescaled / magnitude;

    NormalizedInput {
        x: x * scale,
        y: y * scale,
    }
}

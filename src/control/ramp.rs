//! Acceleration-limited velocity ramp.
//!
//! Each control tick advances the actual velocity toward the target by at
//! most one acceleration (or deceleration) step, producing a trapezoidal
//! velocity profile. This decouples operator input jitter from commanded
//! torque jitter: step discontinuities in the target never reach the robot.
//!
//! The explicit zero action bypasses the ramp entirely. Emergency stop must
//! not be rate-limited.

/// The rate-limited "actual" velocity as of the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RampState {
    pub linear: f64,
    pub angular: f64,
}

/// Per-axis rate limiter stepped once per control tick.
#[derive(Debug)]
pub struct VelocityRamp {
    /// Velocity change per second when ramping up
    accel: f64,
    /// Velocity change per second when ramping down
    decel: f64,
    actual: RampState,
}

impl VelocityRamp {
    pub fn new(accel: f64, decel: f64) -> Self {
        Self {
            accel: accel.abs(),
            decel: decel.abs(),
            actual: RampState::default(),
        }
    }

    /// Current actual velocity.
    pub fn actual(&self) -> RampState {
        self.actual
    }

    /// Advance the actual velocity toward the target over one tick of
    /// `dt` seconds, and return the new actual velocity.
    ///
    /// Within a deceleration step of the target, the actual velocity snaps
    /// to it exactly; otherwise it moves by one step, clamped at the target
    /// so it never overshoots.
    pub fn tick(&mut self, target_linear: f64, target_angular: f64, dt: f64) -> RampState {
        let accel_step = self.accel * dt;
        let decel_step = self.decel * dt;

        self.actual = RampState {
            linear: step_axis(self.actual.linear, target_linear, accel_step, decel_step),
            angular: step_axis(self.actual.angular, target_angular, accel_step, decel_step),
        };
        self.actual
    }

    /// Immediately zero the actual velocity, bypassing rate limits.
    pub fn zero(&mut self) {
        self.actual = RampState::default();
    }
}

fn step_axis(actual: f64, target: f64, accel_step: f64, decel_step: f64) -> f64 {
    let diff = target - actual;
    if diff.abs() < decel_step {
        target
    } else if diff > 0.0 {
        (actual + accel_step).min(target)
    } else {
        (actual - decel_step).max(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f64 = 0.1;

    fn ramp() -> VelocityRamp {
        VelocityRamp::new(10.0, 10.0)
    }

    #[test]
    fn test_step_sequence_to_target() {
        // ACCEL=DECEL=10/s, dt=100ms, target 0 -> 3: actual steps 1.0, 2.0, 3.0
        let mut ramp = ramp();
        assert_eq!(ramp.tick(3.0, 0.0, DT).linear, 1.0);
        assert_eq!(ramp.tick(3.0, 0.0, DT).linear, 2.0);
        assert_eq!(ramp.tick(3.0, 0.0, DT).linear, 3.0);
        // Holds exactly at target once reached
        assert_eq!(ramp.tick(3.0, 0.0, DT).linear, 3.0);
    }

    #[test]
    fn test_snap_within_decel_step() {
        let mut ramp = ramp();
        // diff = 0.5 < decel step of 1.0, snaps straight to target
        assert_eq!(ramp.tick(0.5, 0.0, DT).linear, 0.5);
    }

    #[test]
    fn test_ramp_down_uses_decel() {
        let mut ramp = VelocityRamp::new(10.0, 5.0);
        ramp.actual = RampState {
            linear: 3.0,
            angular: 0.0,
        };
        // decel step = 0.5
        assert_eq!(ramp.tick(0.0, 0.0, DT).linear, 2.5);
        assert_eq!(ramp.tick(0.0, 0.0, DT).linear, 2.0);
    }

    #[test]
    fn test_never_overshoots_with_asymmetric_rates() {
        // accel step (2.0) larger than decel step (0.1): the snap window is
        // too small to catch the approach, the clamp must
        let mut ramp = VelocityRamp::new(20.0, 1.0);
        let mut last = 0.0;
        for _ in 0..50 {
            let state = ramp.tick(3.0, 0.0, DT);
            assert!(state.linear <= 3.0, "overshot to {}", state.linear);
            assert!(state.linear >= last);
            last = state.linear;
        }
        assert_eq!(last, 3.0);
    }

    #[test]
    fn test_both_axes_ramp_independently() {
        let mut ramp = ramp();
        let state = ramp.tick(3.0, -2.0, DT);
        assert_eq!(state.linear, 1.0);
        assert_eq!(state.angular, -1.0);
    }

    #[test]
    fn test_zero_bypasses_ramp() {
        let mut ramp = ramp();
        ramp.tick(3.0, 2.0, DT);
        ramp.tick(3.0, 2.0, DT);
        ramp.zero();
        assert_eq!(ramp.actual(), RampState::default());
    }

    #[test]
    fn test_negative_targets() {
        let mut ramp = ramp();
        assert_eq!(ramp.tick(-3.0, 0.0, DT).linear, -1.0);
        assert_eq!(ramp.tick(-3.0, 0.0, DT).linear, -2.0);
        assert_eq!(ramp.tick(-3.0, 0.0, DT).linear, -3.0);
    }

    proptest! {
        #[test]
        fn prop_converges_in_bounded_ticks(
            target in -5.0f64..=5.0,
            initial in -5.0f64..=5.0,
            accel in 0.5f64..=20.0,
            decel in 0.5f64..=20.0,
        ) {
            let mut ramp = VelocityRamp::new(accel, decel);
            ramp.actual = RampState { linear: initial, angular: 0.0 };

            let slowest = accel.min(decel);
            let bound = ((target - initial).abs() / (slowest * DT)).ceil() as usize + 1;

            let mut reached = false;
            for _ in 0..bound {
                if ramp.tick(target, 0.0, DT).linear == target {
                    reached = true;
                    break;
                }
            }
            prop_assert!(reached, "did not converge within {} ticks", bound);
        }

        #[test]
        fn prop_never_moves_past_target(
            target in -5.0f64..=5.0,
            initial in -5.0f64..=5.0,
        ) {
            let mut ramp = ramp();
            ramp.actual = RampState { linear: initial, angular: 0.0 };

            let mut prev_gap = (target - initial).abs();
            for _ in 0..200 {
                let state = ramp.tick(target, 0.0, DT);
                let gap = (target - state.linear).abs();
                prop_assert!(gap <= prev_gap + 1e-12);
                prev_gap = gap;
            }
        }
    }
}

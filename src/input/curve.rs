//! Response curve shaping for slider and stick positions.
//!
//! A control position `s` in [-1.0, 1.0] is mapped to a velocity with
//! `sign(s) * |s|^exponent * max`. The default exponent of 2.0 compresses
//! sensitivity near center (fine control for small inputs) while preserving
//! the full range at the extremes and the sign of the input.
//!
//! The inverse mapping recovers the control position that corresponds to an
//! externally-set velocity, used to keep a displayed proxy position
//! consistent after a programmatic zero.

/// Shape a normalized control position into a velocity.
///
/// `s` is clamped to [-1.0, 1.0] before shaping. When `max` is zero the
/// output is defined as zero.
///
/// # Example
/// ```
/// use teleop_gw::input::curve::response;
///
/// assert!((response(0.5, 3.0, 2.0) - 0.75).abs() < 1e-9);
/// assert!((response(-0.5, 3.0, 2.0) + 0.75).abs() < 1e-9);
/// assert!((response(1.0, 3.0, 2.0) - 3.0).abs() < 1e-9);
/// assert_eq!(response(0.3, 0.0, 2.0), 0.0);
/// ```
pub fn response(s: f64, max: f64, exponent: f64) -> f64 {
    if max == 0.0 {
        return 0.0;
    }
    let s = s.clamp(-1.0, 1.0);
    s.signum() * s.abs().powf(exponent) * max
}

/// Recover the control position for a velocity (inverse of [`response`]).
///
/// Defined as 0 when `max` is zero so a degenerate bound never divides by
/// zero. The velocity magnitude is clamped to `max` first, so out-of-range
/// values map to the end of the control travel.
pub fn proxy(velocity: f64, max: f64, exponent: f64) -> f64 {
    if max == 0.0 || exponent == 0.0 {
        return 0.0;
    }
    let ratio = (velocity.abs() / max.abs()).min(1.0);
    velocity.signum() * ratio.powf(1.0 / exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_zero_input_is_zero() {
        assert_eq!(response(0.0, 3.0, 2.0), 0.0);
        assert_eq!(response(0.0, 0.0, 2.0), 0.0);
    }

    #[test]
    fn test_quadratic_shape() {
        // sign(s) * s^2 * max at the default exponent
        assert!((response(0.5, 3.0, 2.0) - 0.75).abs() < EPS);
        assert!((response(-0.5, 3.0, 2.0) + 0.75).abs() < EPS);
        assert!((response(0.1, 3.0, 2.0) - 0.03).abs() < EPS);
    }

    #[test]
    fn test_full_deflection_reaches_max() {
        assert!((response(1.0, 3.0, 2.0) - 3.0).abs() < EPS);
        assert!((response(-1.0, 2.0, 2.0) + 2.0).abs() < EPS);
    }

    #[test]
    fn test_zero_max_degrades_to_zero() {
        assert_eq!(response(0.7, 0.0, 2.0), 0.0);
        assert_eq!(proxy(0.7, 0.0, 2.0), 0.0);
    }

    #[test]
    fn test_proxy_of_max_is_full_travel() {
        assert!((proxy(3.0, 3.0, 2.0) - 1.0).abs() < EPS);
        assert!((proxy(-3.0, 3.0, 2.0) + 1.0).abs() < EPS);
    }

    #[test]
    fn test_proxy_clamps_out_of_range_velocity() {
        assert!((proxy(5.0, 3.0, 2.0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_input_clamped_to_unit_range() {
        assert!((response(1.5, 3.0, 2.0) - 3.0).abs() < EPS);
        assert!((response(-1.5, 3.0, 2.0) + 3.0).abs() < EPS);
    }

    proptest! {
        #[test]
        fn prop_round_trip(s in -1.0f64..=1.0, max in 0.01f64..=10.0) {
            let v = response(s, max, 2.0);
            let back = proxy(v, max, 2.0);
            prop_assert!((back - s).abs() < 1e-6);
        }

        #[test]
        fn prop_sign_preserved(s in -1.0f64..=1.0, max in 0.0f64..=10.0) {
            let v = response(s, max, 2.0);
            prop_assert!(v == 0.0 || v.signum() == s.signum());
        }

        #[test]
        fn prop_bounded_by_max(s in -1.0f64..=1.0, max in 0.0f64..=10.0) {
            let v = response(s, max, 2.0);
            prop_assert!(v.abs() <= max + 1e-9);
        }
    }
}

//! Shared integer arithmetic helpers.

/// Clamp an `i128` intermediate back into the `i64` range.
pub(crate) fn clamp_i64(x: i128) -> i64 {
    if x > i64::MAX as i128 {
        i64::MAX
    } else if x < i64::MIN as i128 {
        i64::MIN
    } else {
        x as i64
    }
}

/// `a * b / d` with an `i128` intermediate, rounded half away from zero.
///
/// `d` must be strictly positive.  The result clamps to the `i64` range;
/// overflow in a rescaling step is a caller bug surfaced loudly in debug
/// builds by the assert below, not a routine saturation.
pub(crate) fn mul_div_round(a: i64, b: i64, d: i64) -> i64 {
    debug_assert!(d > 0, "mul_div_round divisor must be > 0, got {d}");
    let prod = (a as i128) * (b as i128);
    let d = d as i128;
    let q = prod / d;
    let r = prod % d;
    // half away from zero
    if 2 * r.abs() >= d {
        clamp_i64(q + prod.signum())
    } else {
        clamp_i64(q)
    }
}

/// Convert a boundary `f64` to a raw fixed-point value at `scale`.
///
/// Returns `None` for non-finite input or values outside the `i64` range.
/// Rounds half away from zero (`f64::round` semantics), so a magnitude
/// below half a resolution step becomes exactly zero.
pub(crate) fn f64_to_raw(x: f64, scale: i64) -> Option<i64> {
    if !x.is_finite() {
        return None;
    }
    let scaled = (x * scale as f64).round();
    if scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
        return None;
    }
    Some(scaled as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_rounds_half_away_from_zero() {
        assert_eq!(mul_div_round(5, 1, 2), 3); // 2.5 -> 3
        assert_eq!(mul_div_round(-5, 1, 2), -3); // -2.5 -> -3
        assert_eq!(mul_div_round(4, 1, 2), 2);
        assert_eq!(mul_div_round(7, 1, 3), 2); // 2.33 -> 2
        assert_eq!(mul_div_round(8, 1, 3), 3); // 2.66 -> 3
    }

    #[test]
    fn mul_div_clamps_on_overflow() {
        assert_eq!(mul_div_round(i64::MAX, 2, 1), i64::MAX);
        assert_eq!(mul_div_round(i64::MIN, 2, 1), i64::MIN);
    }

    #[test]
    fn f64_to_raw_rejects_non_finite() {
        assert_eq!(f64_to_raw(f64::NAN, 100), None);
        assert_eq!(f64_to_raw(f64::INFINITY, 100), None);
        assert_eq!(f64_to_raw(f64::NEG_INFINITY, 100), None);
    }

    #[test]
    fn f64_to_raw_rounds_at_scale() {
        // 1.125 is exactly representable in binary; 112.5 rounds away from zero.
        assert_eq!(f64_to_raw(1.125, 100), Some(113));
        assert_eq!(f64_to_raw(-1.125, 100), Some(-113));
        assert_eq!(f64_to_raw(0.004, 100), Some(0));
    }

    #[test]
    fn f64_to_raw_rejects_out_of_range() {
        assert_eq!(f64_to_raw(1e18, 100_000), None);
    }
}

//! Node activation.
//!
//! Every hidden and output node applies the same squashing function: a
//! logistic curve rescaled to `(-1, 1)`, `f(s) = 2 / (1 + e^(-0.5 s)) - 1`.
//! Its slope at the origin is 0.25.

/// Bipolar logistic activation, bounded in `(-1, 1)`.
///
/// NaN propagates. Infinite inputs saturate to the bounds.
#[inline]
#[must_use]
pub fn bipolar_logistic(x: f32) -> f32 {
    if x.is_nan() {
        return f32::NAN;
    }
    if x == f32::INFINITY {
        return 1.0;
    }
    if x == f32::NEG_INFINITY {
        return -1.0;
    }
    2.0 / (1.0 + (-0.5 * x).exp()) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_maps_to_zero() {
        assert!(bipolar_logistic(0.0).abs() < 1e-6);
    }

    #[test]
    fn test_slope_at_origin() {
        let h = 1e-2;
        let slope = (bipolar_logistic(h) - bipolar_logistic(-h)) / (2.0 * h);
        assert!((slope - 0.25).abs() < 1e-3, "slope was {slope}");
    }

    #[test]
    fn test_matches_closed_form() {
        let w = 0.8_f32;
        let expected = 2.0 / (1.0 + (-0.5 * w).exp()) - 1.0;
        assert_eq!(bipolar_logistic(w).to_bits(), expected.to_bits());
    }

    #[test]
    fn test_odd_symmetry() {
        for x in [0.25_f32, 1.0, 3.5, 10.0] {
            assert!((bipolar_logistic(x) + bipolar_logistic(-x)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bounded() {
        assert!(bipolar_logistic(50.0) <= 1.0);
        assert!(bipolar_logistic(-50.0) >= -1.0);
        assert!((bipolar_logistic(f32::INFINITY) - 1.0).abs() < 1e-6);
        assert!((bipolar_logistic(f32::NEG_INFINITY) + 1.0).abs() < 1e-6);
        assert!(bipolar_logistic(f32::NAN).is_nan());
    }
}

use std::ops::Range;

use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Clamp a half-open index pair to `[0, len]`, slice-style.
///
/// An inverted pair collapses to an empty range instead of panicking.
pub fn clamp_span(len: usize, a: usize, b: usize) -> Range<usize> {
    let b = b.min(len);
    let a = a.min(b);
    a..b
}

/// Forward differences `x[k+1] - x[k]`.
pub fn diff(x: &[Real]) -> Vec<Real> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Mean over the finite entries only; NaN when none are finite.
pub fn finite_mean(x: &[Real]) -> Real {
    let (sum, n) = x
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { Real::NAN } else { sum / n as Real }
}

/// Median of a non-empty slice (average of the two middle values when even).
pub fn median(values: &mut [Real]) -> Option<Real> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(0.5 * (values[mid - 1] + values[mid]))
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn clamp_span_is_slice_like() {
        assert_eq!(clamp_span(10, 2, 5), 2..5);
        assert_eq!(clamp_span(10, 8, 20), 8..10);
        assert_eq!(clamp_span(10, 12, 20), 10..10);
        assert!(clamp_span(10, 6, 3).is_empty());
    }

    #[test]
    fn finite_mean_skips_nan() {
        assert_eq!(finite_mean(&[1.0, Real::NAN, 3.0]), 2.0);
        assert!(finite_mean(&[Real::NAN]).is_nan());
        assert!(finite_mean(&[]).is_nan());
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}

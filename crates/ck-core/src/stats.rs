//! Statistical primitives over index-bounded spans of a sampled signal.
//!
//! Span bounds follow slice semantics: `[a, b)` is clamped to the signal
//! length, and non-finite samples are dropped before any statistic is taken.
//! Every function here reports "not enough data" as NaN rather than an error
//! so that a half-marked selection still yields a partial tuning table.

use crate::numeric::{Real, clamp_span, diff, median};

/// Sample variance via the sum / sum-of-squares identity.
///
/// `(Σx²)/(n-1) - (Σx)²/(n(n-1))`, the formula spreadsheet tools use. It loses
/// precision for large offsets compared to a two-pass algorithm; ramp-noise
/// estimates rely on matching those legacy numbers, so keep it as is.
pub fn sample_variance_excel(values: &[Real]) -> Real {
    let (s1, s2, n) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0.0, 0usize), |(s1, s2, n), &v| (s1 + v, s2 + v * v, n + 1));
    if n < 2 {
        return Real::NAN;
    }
    let n = n as Real;
    s2 / (n - 1.0) - (s1 * s1) / (n * (n - 1.0))
}

/// Median of the strictly positive, finite forward differences of `t`.
pub fn median_sample_spacing(t: &[Real]) -> Real {
    let mut dt: Vec<Real> = diff(t)
        .into_iter()
        .filter(|d| d.is_finite() && *d > 0.0)
        .collect();
    median(&mut dt).unwrap_or(Real::NAN)
}

/// Mean-centred sample variance (ddof = 1) and standard deviation of `x[a..b]`.
///
/// Returns `(NaN, NaN)` with fewer than three finite samples.
pub fn variance_from_steady_span(x: &[Real], a: usize, b: usize) -> (Real, Real) {
    let seg: Vec<Real> = finite_segment(x, a, b);
    if seg.len() < 3 {
        return (Real::NAN, Real::NAN);
    }
    let n = seg.len() as Real;
    let mean = seg.iter().sum::<Real>() / n;
    let var = seg.iter().map(|v| (v - mean) * (v - mean)).sum::<Real>() / (n - 1.0);
    let sigma = if var.is_finite() && var >= 0.0 {
        var.sqrt()
    } else {
        Real::NAN
    };
    (var, sigma)
}

/// Process-noise intensity from the second difference of a ramp span.
///
/// Returns the spreadsheet variance of `diff(diff(x[a..b]))` together with the
/// number of second differences used, or `(NaN, 0)` when the span holds fewer
/// than four finite samples or fewer than two finite second differences.
pub fn process_noise_from_ramp_span(x: &[Real], a: usize, b: usize) -> (Real, usize) {
    let seg = finite_segment(x, a, b);
    if seg.len() < 4 {
        return (Real::NAN, 0);
    }
    let dv: Vec<Real> = diff(&diff(&seg))
        .into_iter()
        .filter(|v| v.is_finite())
        .collect();
    if dv.len() < 2 {
        return (Real::NAN, 0);
    }
    (sample_variance_excel(&dv), dv.len())
}

fn finite_segment(x: &[Real], a: usize, b: usize) -> Vec<Real> {
    x[clamp_span(x.len(), a, b)]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect()
}

//! Automatic location of the step edge and the dead-time onset.

use ck_core::{Real, StepSeries, StepTuneSelections, clamp_span, diff, stats};

/// Samples a baseline span needs before its noise floor is trusted.
const MIN_BASELINE_SAMPLES: usize = 6;
/// Finite PV differences needed inside the baseline.
const MIN_BASELINE_DIFFS: usize = 5;
/// Onset threshold in baseline noise standard deviations.
const ONSET_SIGMAS: Real = 5.0;

/// Index of the commanded step edge.
///
/// The sample after the largest absolute CV jump, or the largest PV jump when
/// CV never moves. Always a valid index into the series.
pub fn auto_detect_step_index(ts: &StepSeries) -> usize {
    let cv = ts.cv();
    let (lo, hi) = cv
        .iter()
        .filter(|v| v.is_finite())
        .fold((Real::INFINITY, Real::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let source = if hi - lo > 1e-9 { cv } else { ts.pv() };
    let edge = argmax_abs(&diff(source)) + 1;
    edge.min(ts.len().saturating_sub(1))
}

/// Index where PV first leaves the baseline noise band after the step.
///
/// Needs a baseline span of at least six samples. `None` when the baseline is
/// missing or too short, or when PV never moves by five baseline sigmas.
pub fn auto_detect_deadtime_index(ts: &StepSeries, sel: &StepTuneSelections) -> Option<usize> {
    let (a, b) = sel.baseline.as_tuple()?;
    let step_i = sel
        .t_step
        .get()
        .unwrap_or_else(|| auto_detect_step_index(ts));

    let pv = ts.pv();
    let dp = diff(pv);

    let base = clamp_span(pv.len(), a, b);
    if base.len() < MIN_BASELINE_SAMPLES {
        return None;
    }
    // Differences that stay inside the baseline.
    let dp_base: Vec<Real> = dp[base.start..base.end - 1]
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if dp_base.len() < MIN_BASELINE_DIFFS {
        return None;
    }

    let (_, sigma) = stats::variance_from_steady_span(&dp_base, 0, dp_base.len());
    let threshold = (ONSET_SIGMAS * sigma).max(1e-12);

    let onset = (step_i.max(1)..dp.len())
        .find(|&k| dp[k].is_finite() && dp[k].abs() >= threshold)
        .map(|k| k + 1);
    tracing::debug!(step_i, sigma, threshold, ?onset, "dead-time scan");
    onset
}

/// First index of the largest magnitude.
fn argmax_abs(d: &[Real]) -> usize {
    let mut best = 0;
    let mut best_v = Real::NEG_INFINITY;
    for (i, v) in d.iter().enumerate() {
        if v.abs() > best_v {
            best = i;
            best_v = v.abs();
        }
    }
    best
}

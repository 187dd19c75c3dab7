//! Per-model fits of a recorded step experiment.
//!
//! Every fit follows the same outline:
//! 1. Resolve the step index and the dead-time anchor, writing auto-detected
//!    indices back into the selections.
//! 2. Take baseline and final levels as span means and derive `du`, `dy`.
//! 3. Fit the model's shape parameters.
//! 4. Evaluate the fitted plant's closed-form step curve on the recorded time
//!    axis and score it.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use ck_core::{Real, StepSeries, StepTuneSelections, clamp_span, finite_mean};
use ck_sim::{
    FopdtParams, IpdtParams, PlantKind, PlantModel, SopdtUnderdampedParams,
    analytic_step_response,
};
use nalgebra::{DMatrix, DVector};

use crate::detect::{auto_detect_deadtime_index, auto_detect_step_index};
use crate::error::{IdentError, IdentResult};
use crate::result::StepIdResult;

/// Fraction of the total change reached after one time constant.
const ONE_TAU_FRACTION: Real = 0.632_120_558_8;
/// Finite points needed for the IPDT slope regression.
const MIN_SLOPE_POINTS: usize = 5;

const IPDT_NOTE: &str = "IPDT fits slope on SLOPE/FIT span; PV does not settle.";

/// Levels shared by all model fits.
struct StepLevels {
    t_step_s: Real,
    theta_s: Real,
    cv0: Real,
    cv1: Real,
    pv0: Real,
    pv1: Real,
    du: Real,
    dy: Real,
}

/// Fit `kind` to the experiment and return the result with its overlay.
///
/// The overlay is the fitted plant's closed-form step curve on `ts.t()`, so it
/// stays bounded however coarse the sampling is relative to the fitted
/// dynamics. Auto-detected step and dead-time indices are stored into `sel`.
pub fn identify(
    ts: &StepSeries,
    sel: &mut StepTuneSelections,
    kind: PlantKind,
) -> IdentResult<(StepIdResult, Vec<Real>)> {
    let levels = step_levels(ts, sel, kind)?;

    let (params, model, note) = match kind {
        PlantKind::Fopdt => fit_fopdt(ts, sel, &levels)?,
        PlantKind::Ipdt => fit_ipdt(ts, sel, &levels)?,
        PlantKind::SopdtUnderdamped => fit_sopdt(ts, sel, &levels)?,
    };

    let overlay =
        analytic_step_response(ts.t(), &model, levels.pv0, levels.du, levels.t_step_s);

    let fit = sel
        .fit
        .as_tuple()
        .map(|(a, b)| clamp_span(ts.len(), a, b));
    let (rmse, n_fit) = match fit {
        Some(range) => (rmse(&ts.pv()[range.clone()], &overlay[range.clone()]), range.len()),
        None => (rmse(ts.pv(), &overlay), ts.len()),
    };

    let result = StepIdResult {
        model: kind,
        cv0: levels.cv0,
        cv1: levels.cv1,
        pv0: levels.pv0,
        pv1: levels.pv1,
        du: levels.du,
        dy: levels.dy,
        t_step_s: levels.t_step_s,
        theta_s: levels.theta_s,
        params,
        rmse,
        n_fit,
        note: note.to_string(),
    };

    tracing::info!(
        model = %kind,
        du = result.du,
        dy = result.dy,
        theta_s = result.theta_s,
        ?rmse,
        n_fit,
        "identified step response"
    );

    Ok((result, overlay))
}

fn step_levels(
    ts: &StepSeries,
    sel: &mut StepTuneSelections,
    kind: PlantKind,
) -> IdentResult<StepLevels> {
    let n = ts.len();
    let t = ts.t();

    let base = sel
        .baseline
        .as_tuple()
        .ok_or_else(|| IdentError::degenerate("select a baseline span first"))?;
    let fin = sel.final_span.as_tuple();
    if fin.is_none() && kind != PlantKind::Ipdt {
        return Err(IdentError::degenerate(format!(
            "select a final span for {kind}"
        )));
    }

    let step_i = match sel.t_step.checked(n, "t_step")? {
        Some(i) => i,
        None => {
            let i = auto_detect_step_index(ts);
            tracing::debug!(index = i, "auto-detected step index");
            sel.t_step.set(i);
            i
        }
    };
    let t_step_s = t[step_i];

    let cv0 = span_mean(ts.cv(), base);
    let pv0 = span_mean(ts.pv(), base);
    let (cv1, pv1) = match fin {
        Some(span) => (span_mean(ts.cv(), span), span_mean(ts.pv(), span)),
        None => (ts.cv()[n - 1], ts.pv()[n - 1]),
    };

    let du = cv1 - cv0;
    let dy = pv1 - pv0;
    if !du.is_finite() || du.abs() < 1e-12 {
        return Err(IdentError::degenerate(
            "CV step size du is ~0; check the baseline/final spans or the CV column",
        ));
    }

    let mut theta_i = sel.theta.checked(n, "theta")?;
    if theta_i.is_none() {
        theta_i = sel.t_dead.checked(n, "t_dead")?;
    }
    if theta_i.is_none()
        && let Some(i) = auto_detect_deadtime_index(ts, sel)
    {
        tracing::debug!(index = i, "auto-detected dead-time onset");
        sel.t_dead.set(i);
        theta_i = Some(i);
    }
    let theta_s = theta_i.map_or(0.0, |i| (t[i] - t_step_s).max(0.0));

    Ok(StepLevels {
        t_step_s,
        theta_s,
        cv0,
        cv1,
        pv0,
        pv1,
        du,
        dy,
    })
}

type Fit = (BTreeMap<String, Real>, PlantModel, &'static str);

fn fit_fopdt(ts: &StepSeries, sel: &StepTuneSelections, lv: &StepLevels) -> IdentResult<Fit> {
    let t = ts.t();
    let pv = ts.pv();
    let dt_s = ts.dt_s();
    let k = lv.dy / lv.du;
    let t_on = lv.t_step_s + lv.theta_s;

    let tau_s = match sel.t63.checked(ts.len(), "t63")? {
        Some(i) => (t[i] - t_on).max(dt_s),
        None => {
            let target = lv.pv0 + ONE_TAU_FRACTION * lv.dy;
            let crossed = |v: Real| {
                if lv.dy >= 0.0 { v >= target } else { v <= target }
            };
            t.iter()
                .position(|&tk| tk >= t_on)
                .and_then(|k0| (k0..pv.len()).find(|&k| pv[k].is_finite() && crossed(pv[k])))
                .map_or(dt_s.max(1e-6), |k| (t[k] - t_on).max(dt_s))
        }
    };

    let params = BTreeMap::from([("K".to_string(), k), ("tau_s".to_string(), tau_s)]);
    let model = PlantModel::Fopdt(FopdtParams {
        k,
        tau_s,
        theta_s: lv.theta_s,
    });
    Ok((params, model, ""))
}

fn fit_ipdt(ts: &StepSeries, sel: &StepTuneSelections, lv: &StepLevels) -> IdentResult<Fit> {
    let (a, b) = sel
        .slope
        .as_tuple()
        .or(sel.fit.as_tuple())
        .or(sel.final_span.as_tuple())
        .ok_or_else(|| {
            IdentError::degenerate("IPDT needs a slope span (preferred) or a fit span over the ramp")
        })?;
    let range = clamp_span(ts.len(), a, b);
    tracing::debug!(a = range.start, b = range.end, "IPDT slope span");

    let (tt, yy): (Vec<Real>, Vec<Real>) = ts.t()[range.clone()]
        .iter()
        .zip(&ts.pv()[range])
        .filter(|(t, y)| t.is_finite() && y.is_finite())
        .map(|(t, y)| (*t, *y))
        .unzip();

    let slope = least_squares_slope(&tt, &yy)?;
    let k = slope / lv.du;

    let params = BTreeMap::from([("K".to_string(), k)]);
    let model = PlantModel::Ipdt(IpdtParams {
        k,
        theta_s: lv.theta_s,
        leak_tau_s: 0.0,
    });
    Ok((params, model, IPDT_NOTE))
}

fn fit_sopdt(ts: &StepSeries, sel: &StepTuneSelections, lv: &StepLevels) -> IdentResult<Fit> {
    let peak_i = sel.peak.checked(ts.len(), "peak")?.ok_or_else(|| {
        IdentError::degenerate("SOPDT_UNDERDAMPED needs a peak point (first overshoot peak)")
    })?;

    let k = lv.dy / lv.du;
    let t_peak = ts.t()[peak_i];
    let pv_peak = ts.pv()[peak_i];

    let mp = if lv.dy.abs() > 1e-12 {
        ((pv_peak - lv.pv1) / lv.dy).abs()
    } else {
        0.0
    };
    if !(mp > 1e-6) {
        return Err(IdentError::degenerate(
            "peak overshoot too small to identify an underdamped response",
        ));
    }

    let ln_mp = mp.ln();
    let zeta = (-ln_mp / (PI * PI + ln_mp * ln_mp).sqrt()).clamp(0.01, 0.99);

    let tp = t_peak - (lv.t_step_s + lv.theta_s);
    if tp <= ts.dt_s() {
        return Err(IdentError::Geometry {
            what: format!("peak time {tp} s is within one sample of the onset; check peak and theta"),
        });
    }
    let wd = 2.0 * PI / tp;
    let wn = wd / (1.0 - zeta * zeta).sqrt();

    let params = BTreeMap::from([
        ("K".to_string(), k),
        ("zeta".to_string(), zeta),
        ("wn".to_string(), wn),
    ]);
    let model = PlantModel::SopdtUnderdamped(SopdtUnderdampedParams {
        k,
        zeta,
        wn,
        theta_s: lv.theta_s,
    });
    Ok((params, model, ""))
}

/// Finite mean of `x[a..b]`, clamped to the slice.
fn span_mean(x: &[Real], (a, b): (usize, usize)) -> Real {
    finite_mean(&x[clamp_span(x.len(), a, b)])
}

/// Root-mean-square of the finite residuals; `None` when there are none.
fn rmse(y: &[Real], y_hat: &[Real]) -> Option<Real> {
    let (sum, n) = y
        .iter()
        .zip(y_hat)
        .map(|(y, h)| y - h)
        .filter(|e| e.is_finite())
        .fold((0.0, 0usize), |(s, n), e| (s + e * e, n + 1));
    (n > 0).then(|| (sum / n as Real).sqrt())
}

/// Slope of the least-squares line `y = m t + c`.
fn least_squares_slope(t: &[Real], y: &[Real]) -> IdentResult<Real> {
    if t.len() < MIN_SLOPE_POINTS {
        return Err(IdentError::InsufficientData {
            what: "IPDT slope span",
            needed: MIN_SLOPE_POINTS,
            got: t.len(),
        });
    }
    let a = DMatrix::from_fn(t.len(), 2, |r, c| if c == 0 { t[r] } else { 1.0 });
    let b = DVector::from_column_slice(y);
    let x = a
        .svd(true, true)
        .solve(&b, 1e-12)
        .map_err(|e| IdentError::Numeric {
            what: format!("slope regression failed: {e}"),
        })?;
    Ok(x[0])
}

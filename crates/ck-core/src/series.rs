//! Immutable sampled-signal value objects.
//!
//! Both series are built once per load and never mutated afterwards; derived
//! views (smoothing) return a new series.

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;
use crate::stats::median_sample_spacing;

/// Minimum number of finite rows a step experiment must keep after cleaning.
pub const MIN_STEP_SAMPLES: usize = 5;

/// A loaded signal: ordered times, values and their median sample spacing.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    t: Vec<Real>,
    x: Vec<Real>,
    dt_s: Real,
    source_path: String,
}

impl TimeSeries {
    /// Build a series from matching time/value columns.
    ///
    /// # Errors
    ///
    /// Fails if the columns differ in length, hold fewer than two samples, or
    /// no strictly positive sample spacing exists.
    pub fn new(t: Vec<Real>, x: Vec<Real>) -> CoreResult<Self> {
        if t.len() != x.len() {
            return Err(CoreError::Validation {
                what: format!("time and value lengths differ ({} vs {})", t.len(), x.len()),
            });
        }
        if t.len() < 2 {
            return Err(CoreError::InsufficientData {
                what: "time series",
                needed: 2,
                got: t.len(),
            });
        }
        let dt_s = median_sample_spacing(&t);
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return Err(CoreError::Validation {
                what: "could not determine a positive dt from time column".to_string(),
            });
        }
        Ok(Self {
            t,
            x,
            dt_s,
            source_path: String::new(),
        })
    }

    /// Attach the path the series was loaded from.
    pub fn with_source(mut self, source_path: impl Into<String>) -> Self {
        self.source_path = source_path.into();
        self
    }

    pub fn t(&self) -> &[Real] {
        &self.t
    }

    pub fn x(&self) -> &[Real] {
        &self.x
    }

    pub fn dt_s(&self) -> Real {
        self.dt_s
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// A recorded step-response experiment.
///
/// `pv` is the signal the identifier works on; `pv_raw` keeps the PV exactly
/// as loaded so smoothing never loses the original samples.
#[derive(Clone, Debug, PartialEq)]
pub struct StepSeries {
    t: Vec<Real>,
    cv: Vec<Real>,
    pv: Vec<Real>,
    pv_raw: Vec<Real>,
    dt_s: Real,
    source_path: String,
}

impl StepSeries {
    /// Build a step series, dropping every row with a non-finite entry.
    ///
    /// The sample spacing is the median positive time step, falling back to
    /// the average spacing when the time column never increases.
    pub fn new(t: Vec<Real>, cv: Vec<Real>, pv: Vec<Real>) -> CoreResult<Self> {
        if t.len() != cv.len() || t.len() != pv.len() {
            return Err(CoreError::Validation {
                what: format!(
                    "step columns differ in length (t={}, cv={}, pv={})",
                    t.len(),
                    cv.len(),
                    pv.len()
                ),
            });
        }

        let mut tt = Vec::with_capacity(t.len());
        let mut cc = Vec::with_capacity(t.len());
        let mut pp = Vec::with_capacity(t.len());
        for ((t, c), p) in t.into_iter().zip(cv).zip(pv) {
            if t.is_finite() && c.is_finite() && p.is_finite() {
                tt.push(t);
                cc.push(c);
                pp.push(p);
            }
        }

        if tt.len() < MIN_STEP_SAMPLES {
            return Err(CoreError::InsufficientData {
                what: "step series after cleaning",
                needed: MIN_STEP_SAMPLES,
                got: tt.len(),
            });
        }

        let mut dt_s = median_sample_spacing(&tt);
        if !dt_s.is_finite() {
            dt_s = (tt[tt.len() - 1] - tt[0]) / (tt.len() - 1) as Real;
        }

        Ok(Self {
            pv_raw: pp.clone(),
            t: tt,
            cv: cc,
            pv: pp,
            dt_s,
            source_path: String::new(),
        })
    }

    pub fn with_source(mut self, source_path: impl Into<String>) -> Self {
        self.source_path = source_path.into();
        self
    }

    /// Return a copy whose PV is a centred moving average of the raw PV.
    ///
    /// The signal is edge-padded by `win / 2` samples on both sides so the
    /// output keeps the input length. `win <= 1` restores the raw PV.
    pub fn smoothed(&self, win: usize) -> Self {
        let mut out = self.clone();
        out.pv = smooth_moving_average(&self.pv_raw, win);
        out
    }

    pub fn t(&self) -> &[Real] {
        &self.t
    }

    pub fn cv(&self) -> &[Real] {
        &self.cv
    }

    pub fn pv(&self) -> &[Real] {
        &self.pv
    }

    pub fn pv_raw(&self) -> &[Real] {
        &self.pv_raw
    }

    pub fn dt_s(&self) -> Real {
        self.dt_s
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Edge-padded centred moving average with window `win`.
pub fn smooth_moving_average(x: &[Real], win: usize) -> Vec<Real> {
    let win = win.max(1);
    if win == 1 || x.is_empty() {
        return x.to_vec();
    }
    let pad = win / 2;
    let first = x[0];
    let last = x[x.len() - 1];
    let padded: Vec<Real> = std::iter::repeat_n(first, pad)
        .chain(x.iter().copied())
        .chain(std::iter::repeat_n(last, pad))
        .collect();
    padded
        .windows(win)
        .map(|w| w.iter().sum::<Real>() / win as Real)
        .collect()
}

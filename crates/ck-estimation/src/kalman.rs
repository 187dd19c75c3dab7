//! Two-state (value, rate) Kalman filter over a captured series.
//!
//! The state is `[x, x_dot]` with a constant-velocity transition
//! `[[1, dt], [0, 1]]` and a direct measurement of `x`. The covariance is
//! tracked as four scalars rather than a matrix type so every step is a fixed,
//! ordered set of floating-point operations.
//!
//! Malformed time steps (`dt <= 0` or non-finite) pass the raw measurement
//! straight through and leave the filter state untouched. An invalid
//! innovation covariance skips the update and keeps the prediction.

use ck_core::{CoreError, CoreResult, Real, TimeSeries};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Rate damping applied when the post-update residual is small.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BleedOff {
    /// Residual magnitude below which the rate is damped.
    pub thresh: Real,
    /// Multiplier applied to the rate estimate, typically in `[0, 1]`.
    pub factor: Real,
}

/// Filter noise configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Measurement noise variance.
    pub r_x: Real,
    /// Process noise variance on the value.
    pub q_x: Real,
    /// Process noise variance on the rate.
    pub q_x_dot: Real,
    /// Optional rate bleed-off near convergence.
    pub bleed: Option<BleedOff>,
    /// Initial covariance entries (symmetric, so `p10 = p01`).
    pub p00: Real,
    pub p01: Real,
    pub p11: Real,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            r_x: 1.0,
            q_x: 0.0,
            q_x_dot: 0.0,
            bleed: None,
            p00: 1.0,
            p01: 0.0,
            p11: 10.0,
        }
    }
}

impl KalmanConfig {
    pub fn new(r_x: Real, q_x: Real, q_x_dot: Real) -> Self {
        Self {
            r_x,
            q_x,
            q_x_dot,
            ..Self::default()
        }
    }

    pub fn with_bleed(mut self, thresh: Real, factor: Real) -> Self {
        self.bleed = Some(BleedOff { thresh, factor });
        self
    }

    pub fn with_initial_covariance(mut self, p00: Real, p01: Real, p11: Real) -> Self {
        self.p00 = p00;
        self.p01 = p01;
        self.p11 = p11;
        self
    }

    /// Check that every parameter is finite.
    ///
    /// `r_x <= 0` is accepted: the filter then skips updates whenever the
    /// innovation covariance is not positive.
    pub fn validate(&self) -> CoreResult<()> {
        let fields = [
            ("r_x", self.r_x),
            ("q_x", self.q_x),
            ("q_x_dot", self.q_x_dot),
            ("p00", self.p00),
            ("p01", self.p01),
            ("p11", self.p11),
        ];
        for (what, value) in fields {
            if !value.is_finite() {
                return Err(CoreError::NonFinite { what, value });
            }
        }
        if let Some(b) = self.bleed
            && !(b.thresh.is_finite() && b.factor.is_finite())
        {
            return Err(CoreError::Validation {
                what: "bleed threshold and factor must be finite".to_string(),
            });
        }
        Ok(())
    }
}

/// 2x2 state covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Covariance {
    pub p00: Real,
    pub p01: Real,
    pub p10: Real,
    pub p11: Real,
}

/// Recursive filter state.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    cfg: KalmanConfig,
    x: Real,
    x_dot: Real,
    p: Covariance,
    skipped_updates: usize,
    passthroughs: usize,
}

impl KalmanFilter {
    /// Start at `x0` with zero rate and the configured initial covariance.
    pub fn new(cfg: KalmanConfig, x0: Real) -> Self {
        Self {
            cfg,
            x: x0,
            x_dot: 0.0,
            p: Covariance {
                p00: cfg.p00,
                p01: cfg.p01,
                p10: cfg.p01,
                p11: cfg.p11,
            },
            skipped_updates: 0,
            passthroughs: 0,
        }
    }

    /// Advance by `dt_s` and fuse one measurement.
    ///
    /// Returns the filtered `(value, rate)` for this sample.
    pub fn step(&mut self, dt_s: Real, measurement: Real) -> (Real, Real) {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            self.passthroughs += 1;
            return (measurement, 0.0);
        }
        let cfg = self.cfg;
        let p = self.p;

        // Predict
        self.x += dt_s * self.x_dot;

        let mut c00 = (p.p00 + dt_s * p.p10) + dt_s * (p.p01 + dt_s * p.p11);
        let c01 = p.p01 + dt_s * p.p11;
        let c10 = p.p10 + dt_s * p.p11;
        let mut c11 = p.p11;

        c00 += cfg.q_x;
        c11 += cfg.q_x_dot;

        // Update
        let residual = measurement - self.x;
        let s = c00 + cfg.r_x;
        if !(s > 0.0 && s.is_finite()) {
            self.skipped_updates += 1;
            return (self.x, self.x_dot);
        }

        let k0 = c00 / s;
        let k1 = c10 / s;

        self.x += k0 * residual;
        self.x_dot += k1 * residual;

        if let Some(bleed) = cfg.bleed
            && (measurement - self.x).abs() < bleed.thresh
        {
            self.x_dot *= bleed.factor;
        }

        let p01 = (1.0 - k0) * c01;
        self.p = Covariance {
            p00: (1.0 - k0) * c00,
            p01,
            // Symmetry is restored explicitly; the computed p10 only drifts.
            p10: p01,
            p11: c11 - k1 * c01,
        };

        (self.x, self.x_dot)
    }

    pub fn value(&self) -> Real {
        self.x
    }

    pub fn rate(&self) -> Real {
        self.x_dot
    }

    pub fn covariance(&self) -> Covariance {
        self.p
    }

    pub fn config(&self) -> &KalmanConfig {
        &self.cfg
    }

    /// Number of steps whose update was skipped for an invalid innovation covariance.
    pub fn skipped_updates(&self) -> usize {
        self.skipped_updates
    }

    /// Number of samples passed through for a malformed time step.
    pub fn passthroughs(&self) -> usize {
        self.passthroughs
    }
}

/// Filtered value and rate, one entry per input sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KalmanOutput {
    pub value: Vec<Real>,
    pub rate: Vec<Real>,
    pub skipped_updates: usize,
    pub passthroughs: usize,
}

/// Run the filter over a whole series in one ordered pass.
///
/// The first sample initialises the state and is echoed unchanged with zero
/// rate. Extra samples in the longer of `t`/`x` are ignored.
pub fn run_kalman(t: &[Real], x: &[Real], cfg: &KalmanConfig) -> KalmanOutput {
    let n = t.len().min(x.len());
    if n == 0 {
        return KalmanOutput::default();
    }

    let mut filter = KalmanFilter::new(*cfg, x[0]);
    let mut value = Vec::with_capacity(n);
    let mut rate = Vec::with_capacity(n);
    value.push(x[0]);
    rate.push(0.0);

    for k in 1..n {
        let (v, r) = filter.step(t[k] - t[k - 1], x[k]);
        value.push(v);
        rate.push(r);
    }

    if filter.skipped_updates() > 0 || filter.passthroughs() > 0 {
        tracing::debug!(
            samples = n,
            skipped_updates = filter.skipped_updates(),
            passthroughs = filter.passthroughs(),
            "kalman run had degenerate steps"
        );
    }

    KalmanOutput {
        value,
        rate,
        skipped_updates: filter.skipped_updates(),
        passthroughs: filter.passthroughs(),
    }
}

/// Filter independent series in parallel; each series is still a serial pass.
pub fn run_kalman_batch(series: &[TimeSeries], cfg: &KalmanConfig) -> Vec<KalmanOutput> {
    series
        .par_iter()
        .map(|ts| run_kalman(ts.t(), ts.x(), cfg))
        .collect()
}

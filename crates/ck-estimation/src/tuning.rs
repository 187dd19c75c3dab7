//! Filter noise suggestions from user-marked spans.
//!
//! A steady span gives the measurement noise `r_x`; a ramp span gives the
//! rate-noise intensity `q_x_dot` from second differences. Three discrete
//! position-noise variants are derived from `q_x_dot` and the sample spacing,
//! one per discretisation convention; callers pick one via [`QxConvention`].

use ck_core::stats::{process_noise_from_ramp_span, variance_from_steady_span};
use ck_core::{Real, SpanSelections, TimeSeries};
use serde::{Deserialize, Serialize};

use crate::kalman::KalmanConfig;

/// Span-based covariance estimates. Fields are NaN when their span is unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub r_x: Real,
    pub sigma_x: Real,

    pub q_x_dot: Real,
    pub dv_count: usize,

    /// `q_x_dot * dt^2`
    pub q_x_user: Real,
    /// `0.25 * q_x_dot * dt^2`
    pub q_x_consistent: Real,
    /// `0.5 * q_x_dot * dt`, the value/rate cross term
    pub q_xv_consistent: Real,

    pub steady_span: Option<(usize, usize)>,
    pub ramp_span: Option<(usize, usize)>,
}

impl TuningResult {
    pub fn suggested_q_x(&self, convention: QxConvention) -> Real {
        match convention {
            QxConvention::User => self.q_x_user,
            QxConvention::Consistent => self.q_x_consistent,
        }
    }
}

/// Which discretisation of `q_x_dot` feeds the filter's `q_x`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QxConvention {
    #[default]
    User,
    Consistent,
}

/// Compute the suggested noise parameters. Never fails; missing spans give NaN.
pub fn compute_tuning(ts: &TimeSeries, spans: &SpanSelections) -> TuningResult {
    let steady_span = spans.steady.as_tuple();
    let ramp_span = spans.ramp.as_tuple();

    let (r_x, sigma_x) = match steady_span {
        Some((a, b)) => variance_from_steady_span(ts.x(), a, b),
        None => (Real::NAN, Real::NAN),
    };

    let (q_x_dot, dv_count) = match ramp_span {
        Some((a, b)) => process_noise_from_ramp_span(ts.x(), a, b),
        None => (Real::NAN, 0),
    };

    let dt = ts.dt_s();
    let (q_x_user, q_x_consistent, q_xv_consistent) = if q_x_dot.is_finite() && dt.is_finite() {
        (
            q_x_dot * dt * dt,
            0.25 * q_x_dot * dt * dt,
            0.5 * q_x_dot * dt,
        )
    } else {
        (Real::NAN, Real::NAN, Real::NAN)
    };

    TuningResult {
        r_x,
        sigma_x,
        q_x_dot,
        dv_count,
        q_x_user,
        q_x_consistent,
        q_xv_consistent,
        steady_span,
        ramp_span,
    }
}

/// Manual-vs-suggested switch per noise parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningOverrides {
    pub use_manual_r_x: bool,
    pub use_manual_q_x: bool,
    pub use_manual_q_x_dot: bool,

    pub manual_r_x: Real,
    pub manual_q_x: Real,
    pub manual_q_x_dot: Real,
}

impl Default for TuningOverrides {
    fn default() -> Self {
        Self {
            use_manual_r_x: false,
            use_manual_q_x: false,
            use_manual_q_x_dot: false,
            manual_r_x: 1.0,
            manual_q_x: 0.0,
            manual_q_x_dot: 0.0,
        }
    }
}

impl TuningOverrides {
    pub fn active_r_x(&self, suggested: Real) -> Real {
        if self.use_manual_r_x {
            self.manual_r_x
        } else {
            suggested
        }
    }

    pub fn active_q_x(&self, suggested: Real) -> Real {
        if self.use_manual_q_x {
            self.manual_q_x
        } else {
            suggested
        }
    }

    pub fn active_q_x_dot(&self, suggested: Real) -> Real {
        if self.use_manual_q_x_dot {
            self.manual_q_x_dot
        } else {
            suggested
        }
    }

    /// Set the manual `q_x` to `manual_q_x_dot * dt^2` and switch it on.
    pub fn map_q_x_from_q_x_dot(&mut self, dt_s: Real) {
        self.manual_q_x = self.manual_q_x_dot * dt_s * dt_s;
        self.use_manual_q_x = true;
    }

    /// Merge suggestions and overrides into a runnable filter config.
    ///
    /// Bleed-off and the initial covariance come from `base`. Returns `None`
    /// unless all three active noise values are finite.
    pub fn resolve(
        &self,
        result: &TuningResult,
        convention: QxConvention,
        base: &KalmanConfig,
    ) -> Option<KalmanConfig> {
        let r_x = self.active_r_x(result.r_x);
        let q_x = self.active_q_x(result.suggested_q_x(convention));
        let q_x_dot = self.active_q_x_dot(result.q_x_dot);
        if !(r_x.is_finite() && q_x.is_finite() && q_x_dot.is_finite()) {
            return None;
        }
        Some(KalmanConfig {
            r_x,
            q_x,
            q_x_dot,
            ..*base
        })
    }
}

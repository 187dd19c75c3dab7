//! Actuator chain between the commanded CV and the plant input.
//!
//! Each sample passes, in order, through:
//! - **Saturation** to `[pv_min, pv_max]` (either bound may be absent)
//! - **Rate limiting**: `|u[k] - u[k-1]| <= rate_limit * dt` when `rate_limit > 0`
//! - **First-order lag**: `y[k] = y[k-1] + (dt/tau) * (u[k] - y[k-1])` when `tau_s > 0`
//!
//! Both dynamic stages are causal recurrences, so the chain is evaluated one
//! sample at a time through [`ActuatorState`].

use ck_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Actuator chain parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorParams {
    /// Plant output offset added to the simulated response.
    pub pv0: Real,
    /// Lower saturation bound; `None` leaves the command unbounded below.
    pub pv_min: Option<Real>,
    /// Upper saturation bound; `None` leaves the command unbounded above.
    pub pv_max: Option<Real>,
    /// Maximum rate of change (units/s); `<= 0` disables rate limiting.
    pub rate_limit: Real,
    /// Lag time constant (seconds); `<= 0` disables the lag.
    pub tau_s: Real,
}

impl Default for ActuatorParams {
    fn default() -> Self {
        Self {
            pv0: 0.0,
            pv_min: None,
            pv_max: None,
            rate_limit: 0.0,
            tau_s: 0.0,
        }
    }
}

/// Internal state of the two dynamic stages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActuatorState {
    /// Output of the rate limiter.
    pub rate_limited: Real,
    /// Output of the lag, i.e. the effective plant input.
    pub position: Real,
}

impl ActuatorParams {
    pub fn validate(&self) -> SimResult<()> {
        if !self.pv0.is_finite() {
            return Err(SimError::InvalidArg {
                what: "pv0 must be finite",
            });
        }
        if !self.rate_limit.is_finite() {
            return Err(SimError::InvalidArg {
                what: "rate_limit must be finite",
            });
        }
        if !self.tau_s.is_finite() {
            return Err(SimError::InvalidArg {
                what: "tau_s must be finite",
            });
        }
        Ok(())
    }

    /// Clamp a command into the saturation bounds.
    ///
    /// Lower bound first, then upper: with `pv_max < pv_min` the upper bound wins.
    pub fn saturate(&self, command: Real) -> Real {
        let mut u = command;
        if let Some(lo) = self.pv_min {
            u = u.max(lo);
        }
        if let Some(hi) = self.pv_max {
            u = u.min(hi);
        }
        u
    }

    /// State after the first command sample: both stages start at the saturated value.
    pub fn initial_state(&self, command: Real) -> ActuatorState {
        let u = self.saturate(command);
        ActuatorState {
            rate_limited: u,
            position: u,
        }
    }

    /// Advance the chain by `dt` for one command sample.
    pub fn step(&self, state: &ActuatorState, dt: Real, command: Real) -> ActuatorState {
        let mut u = self.saturate(command);

        if self.rate_limit > 0.0 {
            let max_step = self.rate_limit * dt;
            let mut du = u - state.rate_limited;
            if du > max_step {
                du = max_step;
            } else if du < -max_step {
                du = -max_step;
            }
            u = state.rate_limited + du;
        }
        let rate_limited = u;

        if self.tau_s > 0.0 {
            let a = dt / self.tau_s.max(1e-12);
            u = state.position + a * (rate_limited - state.position);
        }

        ActuatorState {
            rate_limited,
            position: u,
        }
    }

    /// Run a whole command series through the chain.
    pub fn apply(&self, command: &[Real], dt: Real) -> Vec<Real> {
        let Some((&first, rest)) = command.split_first() else {
            return Vec::new();
        };
        let mut state = self.initial_state(first);
        let mut out = Vec::with_capacity(command.len());
        out.push(state.position);
        for &cmd in rest {
            state = self.step(&state, dt, cmd);
            out.push(state.position);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limits_is_identity() {
        let act = ActuatorParams::default();
        let cmd = [0.0, 0.0, 10.0, 10.0, -3.0];
        assert_eq!(act.apply(&cmd, 0.1), cmd.to_vec());
    }

    #[test]
    fn saturation_clamps_both_sides() {
        let act = ActuatorParams {
            pv_min: Some(0.0),
            pv_max: Some(5.0),
            ..ActuatorParams::default()
        };
        assert_eq!(act.apply(&[-2.0, 3.0, 9.0], 0.1), vec![0.0, 3.0, 5.0]);
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let act = ActuatorParams {
            pv_min: Some(9.0),
            pv_max: Some(2.0),
            ..ActuatorParams::default()
        };
        assert_eq!(act.saturate(0.0), 2.0);
        assert_eq!(act.saturate(20.0), 2.0);
    }

    #[test]
    fn rate_limiting() {
        let act = ActuatorParams {
            rate_limit: 2.0,
            ..ActuatorParams::default()
        };
        let out = act.apply(&[0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0], 0.1);
        // At most 0.2 per sample.
        let expected = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 1.0];
        for (o, e) in out.iter().zip(expected) {
            assert!((o - e).abs() < 1e-12, "{o} vs {e}");
        }
    }

    #[test]
    fn first_order_lag_step_response() {
        let act = ActuatorParams {
            tau_s: 0.5,
            ..ActuatorParams::default()
        };
        let mut cmd = vec![0.0];
        cmd.extend(std::iter::repeat_n(1.0, 200));
        let out = act.apply(&cmd, 0.01);
        // a = 0.02: y[n] = 1 - 0.98^n
        assert!((out[1] - 0.02).abs() < 1e-12);
        assert!((out[50] - (1.0 - 0.98f64.powi(50))).abs() < 1e-12);
        assert!(out.windows(2).all(|w| w[1] >= w[0]));
        assert!(out[200] > 0.98);
    }

    #[test]
    fn empty_command() {
        assert!(ActuatorParams::default().apply(&[], 0.1).is_empty());
    }

    #[test]
    fn validate_rejects_non_finite() {
        let act = ActuatorParams {
            tau_s: Real::NAN,
            ..ActuatorParams::default()
        };
        assert!(act.validate().is_err());
        assert!(ActuatorParams::default().validate().is_ok());
    }
}

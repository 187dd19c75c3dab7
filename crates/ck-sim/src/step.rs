//! Commanded-step simulation.

use ck_core::Real;
use serde::{Deserialize, Serialize};

use crate::actuator::ActuatorParams;
use crate::error::{SimError, SimResult};
use crate::plant::{PlantModel, apply_deadtime};

/// Commanded step definition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSpec {
    /// Sample period (seconds)
    pub dt_s: Real,
    /// Simulated span (seconds)
    pub duration_s: Real,
    /// Time at which the command switches (seconds)
    pub t_step_s: Real,
    /// Command before the step
    pub cv0: Real,
    /// Command from the step onwards
    pub cv_step: Real,
}

impl Default for StepSpec {
    fn default() -> Self {
        Self {
            dt_s: 0.05,
            duration_s: 5.0,
            t_step_s: 1.0,
            cv0: 0.0,
            cv_step: 10.0,
        }
    }
}

impl StepSpec {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt_s must be positive",
            });
        }
        if !(self.duration_s.is_finite() && self.duration_s > 0.0) {
            return Err(SimError::InvalidArg {
                what: "duration_s must be positive",
            });
        }
        if !(self.t_step_s.is_finite() && self.cv0.is_finite() && self.cv_step.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "t_step_s, cv0 and cv_step must be finite",
            });
        }
        Ok(())
    }

    /// Evenly spaced grid from 0 to `duration_s` inclusive.
    pub fn time_grid(&self) -> SimResult<Vec<Real>> {
        self.validate()?;
        let dt = self.dt_s.max(1e-6);
        let n = (self.duration_s / dt).round_ties_even() as usize + 1;
        if n < 2 {
            return Err(SimError::InvalidArg {
                what: "duration_s must be >= dt_s",
            });
        }
        let step = self.duration_s / (n - 1) as Real;
        let mut t: Vec<Real> = (0..n).map(|i| i as Real * step).collect();
        t[n - 1] = self.duration_s;
        Ok(t)
    }
}

/// Simulated experiment, one entry per grid sample.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResponse {
    pub t: Vec<Real>,
    /// Commanded CV
    pub cv_cmd: Vec<Real>,
    /// CV after the actuator chain
    pub cv_eff: Vec<Real>,
    pub pv: Vec<Real>,
}

/// Step command: `cv0` before `t_step_s`, `cv_step` from it on.
pub fn make_step_cv(t: &[Real], spec: &StepSpec) -> Vec<Real> {
    t.iter()
        .map(|&t| if t >= spec.t_step_s { spec.cv_step } else { spec.cv0 })
        .collect()
}

/// Simulate the actuator chain and plant for a commanded step.
///
/// The plant is driven by the actuator output minus `cv0`, delayed by the
/// model's dead time; the reported PV is `actuator.pv0` plus the plant output.
pub fn simulate_step_response(
    spec: &StepSpec,
    actuator: &ActuatorParams,
    model: &PlantModel,
) -> SimResult<StepResponse> {
    actuator.validate()?;
    let t = spec.time_grid()?;
    let dt = spec.dt_s.max(1e-6);

    let cv_cmd = make_step_cv(&t, spec);
    let cv_eff = actuator.apply(&cv_cmd, dt);

    let u: Vec<Real> = cv_eff.iter().map(|v| v - spec.cv0).collect();
    let u_d = apply_deadtime(&u, dt, model.theta_s());
    let pv = model
        .respond(&u_d, dt)
        .into_iter()
        .map(|y| actuator.pv0 + y)
        .collect();

    tracing::debug!(
        model = %model.kind(),
        samples = t.len(),
        dt_s = dt,
        "simulated step response"
    );

    Ok(StepResponse {
        t,
        cv_cmd,
        cv_eff,
        pv,
    })
}

/// Simulate a fitted model on a recorded time axis.
///
/// The input is a step of `du` at `t_step_s` sampled on `t`; integration uses
/// the series' nominal spacing `dt_s`. Returns `pv0 + y` per sample.
pub fn simulate_on_grid(
    t: &[Real],
    dt_s: Real,
    t_step_s: Real,
    du: Real,
    pv0: Real,
    model: &PlantModel,
) -> Vec<Real> {
    let u: Vec<Real> = t
        .iter()
        .map(|&t| if t >= t_step_s { du } else { 0.0 })
        .collect();
    let u_d = apply_deadtime(&u, dt_s, model.theta_s());
    model
        .respond(&u_d, dt_s)
        .into_iter()
        .map(|y| pv0 + y)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plant::FopdtParams;

    #[test]
    fn grid_covers_duration() {
        let spec = StepSpec::default();
        let t = spec.time_grid().unwrap();
        assert_eq!(t.len(), 101);
        assert_eq!(t[0], 0.0);
        assert_eq!(t[100], 5.0);
        assert!((t[20] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_specs_rejected() {
        let bad_dt = StepSpec {
            dt_s: 0.0,
            ..StepSpec::default()
        };
        assert!(matches!(bad_dt.time_grid(), Err(SimError::InvalidArg { .. })));

        let too_short = StepSpec {
            dt_s: 1.0,
            duration_s: 0.2,
            ..StepSpec::default()
        };
        assert!(too_short.time_grid().is_err());

        let nan_step = StepSpec {
            t_step_s: Real::NAN,
            ..StepSpec::default()
        };
        assert!(nan_step.validate().is_err());
    }

    #[test]
    fn step_command_switches_at_t_step() {
        let spec = StepSpec {
            t_step_s: 0.2,
            cv0: 1.0,
            cv_step: 3.0,
            ..StepSpec::default()
        };
        let cv = make_step_cv(&[0.0, 0.1, 0.2, 0.3], &spec);
        assert_eq!(cv, vec![1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn pv_offset_applied() {
        let act = ActuatorParams {
            pv0: 20.0,
            ..ActuatorParams::default()
        };
        let res =
            simulate_step_response(&StepSpec::default(), &act, &PlantModel::default()).unwrap();
        assert_eq!(res.pv[0], 20.0);
        assert!(res.pv[100] > 29.0);
    }

    #[test]
    fn on_grid_matches_step_simulation_without_actuator() {
        let spec = StepSpec::default();
        let model = PlantModel::Fopdt(FopdtParams::default());
        let sim = simulate_step_response(&spec, &ActuatorParams::default(), &model).unwrap();
        let overlay = simulate_on_grid(&sim.t, spec.dt_s, spec.t_step_s, spec.cv_step, 0.0, &model);
        assert_eq!(overlay, sim.pv);
    }
}

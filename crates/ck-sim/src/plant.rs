//! Plant transfer-function families and their Euler integrators.
//!
//! All plants start at rest (`y = 0`) and are driven by the deviation of the
//! actuator output from its initial value. Sample `k` is computed from the
//! state and input of sample `k - 1`, so the output lags the input by one
//! sample on top of any dead time.

use std::fmt;
use std::str::FromStr;

use ck_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// First-order plus dead time: `tau * y' = K * u - y`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FopdtParams {
    #[serde(rename = "K")]
    pub k: Real,
    pub tau_s: Real,
    pub theta_s: Real,
}

impl Default for FopdtParams {
    fn default() -> Self {
        Self {
            k: 1.0,
            tau_s: 0.3,
            theta_s: 0.2,
        }
    }
}

/// Integrating plus dead time: `y' = K * u`, optionally leaky.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpdtParams {
    #[serde(rename = "K")]
    pub k: Real,
    pub theta_s: Real,
    /// Leak time constant; `<= 0` gives a pure integrator.
    pub leak_tau_s: Real,
}

impl Default for IpdtParams {
    fn default() -> Self {
        Self {
            k: 0.4,
            theta_s: 0.3,
            leak_tau_s: 0.0,
        }
    }
}

/// Underdamped second order plus dead time:
/// `y'' = -2 zeta wn y' - wn^2 y + K wn^2 u`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SopdtUnderdampedParams {
    #[serde(rename = "K")]
    pub k: Real,
    pub zeta: Real,
    pub wn: Real,
    pub theta_s: Real,
}

impl Default for SopdtUnderdampedParams {
    fn default() -> Self {
        Self {
            k: 1.0,
            zeta: 0.45,
            wn: 6.0,
            theta_s: 0.0,
        }
    }
}

/// Plant family discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlantKind {
    #[serde(rename = "FOPDT")]
    Fopdt,
    #[serde(rename = "IPDT")]
    Ipdt,
    #[serde(rename = "SOPDT_UNDERDAMPED")]
    SopdtUnderdamped,
}

impl PlantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fopdt => "FOPDT",
            Self::Ipdt => "IPDT",
            Self::SopdtUnderdamped => "SOPDT_UNDERDAMPED",
        }
    }
}

impl fmt::Display for PlantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "FOPDT" => Ok(Self::Fopdt),
            "IPDT" => Ok(Self::Ipdt),
            "SOPDT_UNDERDAMPED" | "SOPDT" => Ok(Self::SopdtUnderdamped),
            _ => Err(SimError::UnknownModel {
                name: s.to_string(),
            }),
        }
    }
}

/// A plant with its parameters, tagged by family.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum PlantModel {
    #[serde(rename = "FOPDT")]
    Fopdt(FopdtParams),
    #[serde(rename = "IPDT")]
    Ipdt(IpdtParams),
    #[serde(rename = "SOPDT_UNDERDAMPED")]
    SopdtUnderdamped(SopdtUnderdampedParams),
}

impl Default for PlantModel {
    fn default() -> Self {
        Self::Fopdt(FopdtParams::default())
    }
}

impl PlantModel {
    /// Default parameters for a family.
    pub fn default_for(kind: PlantKind) -> Self {
        match kind {
            PlantKind::Fopdt => Self::Fopdt(FopdtParams::default()),
            PlantKind::Ipdt => Self::Ipdt(IpdtParams::default()),
            PlantKind::SopdtUnderdamped => Self::SopdtUnderdamped(SopdtUnderdampedParams::default()),
        }
    }

    pub fn kind(&self) -> PlantKind {
        match self {
            Self::Fopdt(_) => PlantKind::Fopdt,
            Self::Ipdt(_) => PlantKind::Ipdt,
            Self::SopdtUnderdamped(_) => PlantKind::SopdtUnderdamped,
        }
    }

    pub fn gain(&self) -> Real {
        match self {
            Self::Fopdt(p) => p.k,
            Self::Ipdt(p) => p.k,
            Self::SopdtUnderdamped(p) => p.k,
        }
    }

    pub fn theta_s(&self) -> Real {
        match self {
            Self::Fopdt(p) => p.theta_s,
            Self::Ipdt(p) => p.theta_s,
            Self::SopdtUnderdamped(p) => p.theta_s,
        }
    }

    /// Integrate the plant response to an already delayed input.
    pub fn respond(&self, u: &[Real], dt_s: Real) -> Vec<Real> {
        match self {
            Self::Fopdt(p) => integrate(p, u, dt_s),
            Self::Ipdt(p) => integrate(p, u, dt_s),
            Self::SopdtUnderdamped(p) => integrate(p, u, dt_s),
        }
    }
}

/// One explicit integration step of a plant family.
pub trait PlantDynamics {
    /// Integrator state, at rest when default.
    type State: Copy + Default;

    /// Advance the state by `dt` with input `u` held over the step.
    fn advance(&self, x: Self::State, u: Real, dt: Real) -> Self::State;

    /// Plant output for a state.
    fn output(&self, x: &Self::State) -> Real;
}

impl PlantDynamics for FopdtParams {
    type State = Real;

    fn advance(&self, y: Real, u: Real, dt: Real) -> Real {
        let tau = self.tau_s.max(1e-9);
        let ydot = (self.k * u - y) / tau;
        y + dt * ydot
    }

    fn output(&self, y: &Real) -> Real {
        *y
    }
}

impl PlantDynamics for IpdtParams {
    type State = Real;

    fn advance(&self, y: Real, u: Real, dt: Real) -> Real {
        let ydot = if self.leak_tau_s > 1e-9 {
            self.k * u - y / self.leak_tau_s
        } else {
            self.k * u
        };
        y + dt * ydot
    }

    fn output(&self, y: &Real) -> Real {
        *y
    }
}

impl PlantDynamics for SopdtUnderdampedParams {
    /// `(y, y')`
    type State = (Real, Real);

    fn advance(&self, (y, ydot): (Real, Real), u: Real, dt: Real) -> (Real, Real) {
        let wn = self.wn.max(1e-6);
        let yddot = (-2.0 * self.zeta * wn) * ydot - (wn * wn) * y + (self.k * wn * wn) * u;
        // Velocity first, then position from the updated velocity.
        let ydot = ydot + dt * yddot;
        (y + dt * ydot, ydot)
    }

    fn output(&self, x: &(Real, Real)) -> Real {
        x.0
    }
}

/// Run a plant over an input series; `y[0]` is the rest output.
pub fn integrate<P: PlantDynamics>(plant: &P, u: &[Real], dt_s: Real) -> Vec<Real> {
    let mut x = P::State::default();
    let mut y = Vec::with_capacity(u.len());
    if u.is_empty() {
        return y;
    }
    y.push(plant.output(&x));
    for k in 1..u.len() {
        x = plant.advance(x, u[k - 1], dt_s);
        y.push(plant.output(&x));
    }
    y
}

/// Shift `u` right by `round(theta / dt)` samples, holding `u[0]` meanwhile.
///
/// Halfway cases round to even.
pub fn apply_deadtime(u: &[Real], dt_s: Real, theta_s: Real) -> Vec<Real> {
    let n_delay = (theta_s.max(0.0) / dt_s.max(1e-12)).round_ties_even();
    if !(n_delay >= 1.0) || u.is_empty() {
        return u.to_vec();
    }
    let n_delay = (n_delay as usize).min(u.len());
    let mut out = Vec::with_capacity(u.len());
    out.extend(std::iter::repeat_n(u[0], n_delay));
    out.extend_from_slice(&u[..u.len() - n_delay]);
    out
}

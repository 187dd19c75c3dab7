//! Identification output.

use std::collections::BTreeMap;

use ck_core::Real;
use ck_sim::{FopdtParams, IpdtParams, PlantKind, PlantModel, SopdtUnderdampedParams};
use serde::{Deserialize, Serialize};

use crate::error::{IdentError, IdentResult};

/// Fitted step-experiment summary.
///
/// `params` is an open table: each model writes its own shape parameters
/// (`K`, `tau_s`, `zeta`, `wn`) and tuning rules later add `Kp`, `Ki`, `Kd`,
/// `Ti` and `Td` under the same map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepIdResult {
    pub model: PlantKind,

    pub cv0: Real,
    pub cv1: Real,
    pub pv0: Real,
    pub pv1: Real,
    pub du: Real,
    pub dy: Real,

    pub t_step_s: Real,
    pub theta_s: Real,

    pub params: BTreeMap<String, Real>,

    /// Overlay error over the fit span; `None` when no sample contributed.
    pub rmse: Option<Real>,
    pub n_fit: usize,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl StepIdResult {
    pub fn get(&self, key: &str) -> Option<Real> {
        self.params.get(key).copied()
    }

    pub fn set(&mut self, key: &str, value: Real) {
        self.params.insert(key.to_string(), value);
    }

    fn require(&self, key: &str) -> IdentResult<Real> {
        self.get(key)
            .filter(|v| v.is_finite())
            .ok_or_else(|| IdentError::degenerate(format!("{} result has no {key}", self.model)))
    }

    /// Rebuild the fitted plant from the parameter table.
    pub fn plant_model(&self) -> IdentResult<PlantModel> {
        let k = self.require("K")?;
        let theta_s = self.theta_s;
        Ok(match self.model {
            PlantKind::Fopdt => PlantModel::Fopdt(FopdtParams {
                k,
                tau_s: self.require("tau_s")?,
                theta_s,
            }),
            PlantKind::Ipdt => PlantModel::Ipdt(IpdtParams {
                k,
                theta_s,
                leak_tau_s: 0.0,
            }),
            PlantKind::SopdtUnderdamped => PlantModel::SopdtUnderdamped(SopdtUnderdampedParams {
                k,
                zeta: self.require("zeta")?,
                wn: self.require("wn")?,
                theta_s,
            }),
        })
    }
}

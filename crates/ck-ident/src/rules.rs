//! PI/PID gain rules for fitted step models.

use std::fmt;
use std::str::FromStr;

use ck_core::Real;
use ck_sim::PlantKind;
use serde::{Deserialize, Serialize};

use crate::error::{IdentError, IdentResult};
use crate::result::StepIdResult;

/// Tuning rule family.
///
/// Only FOPDT distinguishes between the methods, and only `IMC_PI` versus the
/// rest; IPDT always gets the SIMC PI and underdamped SOPDT always gets the
/// effective-time-constant PI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TuningMethod {
    #[default]
    #[serde(rename = "IMC_PID")]
    ImcPid,
    #[serde(rename = "IMC_PI")]
    ImcPi,
    #[serde(rename = "SIMC_PI")]
    SimcPi,
}

impl TuningMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImcPid => "IMC_PID",
            Self::ImcPi => "IMC_PI",
            Self::SimcPi => "SIMC_PI",
        }
    }
}

impl fmt::Display for TuningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TuningMethod {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "IMC_PID" => Ok(Self::ImcPid),
            "IMC_PI" => Ok(Self::ImcPi),
            "SIMC_PI" => Ok(Self::SimcPi),
            _ => Err(IdentError::degenerate(format!("unknown tuning method: {s}"))),
        }
    }
}

/// Parallel-form gains with the equivalent integral and derivative times.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    #[serde(rename = "Kp")]
    pub kp: Real,
    #[serde(rename = "Ki")]
    pub ki: Real,
    #[serde(rename = "Kd")]
    pub kd: Real,
    #[serde(rename = "Ti")]
    pub ti: Real,
    #[serde(rename = "Td")]
    pub td: Real,
}

impl PidGains {
    fn pi(kp: Real, ti: Real) -> Self {
        Self {
            kp,
            ki: kp / ti,
            kd: 0.0,
            ti,
            td: 0.0,
        }
    }

    pub fn entries(&self) -> [(&'static str, Real); 5] {
        [
            ("Kp", self.kp),
            ("Ki", self.ki),
            ("Kd", self.kd),
            ("Ti", self.ti),
            ("Td", self.td),
        ]
    }
}

/// Derive controller gains from an identified model.
///
/// `lam_s` is the desired closed-loop time constant, floored at `1e-6`.
pub fn compute_pid_gains(
    kind: PlantKind,
    result: &StepIdResult,
    method: TuningMethod,
    lam_s: Real,
) -> IdentResult<PidGains> {
    let lam = lam_s.max(1e-6);
    let theta = result.theta_s.max(0.0);
    let k = result.get("K").unwrap_or(0.0);
    if !(k.abs() >= 1e-12) {
        return Err(IdentError::degenerate(format!(
            "cannot tune {kind}: model gain K is ~0"
        )));
    }

    let gains = match kind {
        PlantKind::Fopdt => {
            let tau = result.get("tau_s").unwrap_or(0.0).max(1e-6);
            match method {
                TuningMethod::ImcPi => PidGains::pi(tau / (k * (lam + theta)), tau),
                // SIMC_PI has no FOPDT rule of its own and shares the IMC PID.
                TuningMethod::ImcPid | TuningMethod::SimcPi => {
                    let kp = (tau + 0.5 * theta) / (k * (lam + 0.5 * theta));
                    let ti = tau + 0.5 * theta;
                    let den = 2.0 * tau + theta;
                    let td = if den > 1e-12 { tau * theta / den } else { 0.0 };
                    PidGains {
                        kp,
                        ki: kp / ti.max(1e-9),
                        kd: kp * td,
                        ti,
                        td,
                    }
                }
            }
        }
        PlantKind::Ipdt => {
            let th = theta.max(1e-6);
            PidGains::pi(1.0 / (k * th), 4.0 * th)
        }
        PlantKind::SopdtUnderdamped => {
            let zeta = result.get("zeta").unwrap_or(0.0);
            let wn = result.get("wn").unwrap_or(0.0);
            if !(zeta > 0.0 && wn > 0.0) {
                return Err(IdentError::degenerate(
                    "cannot tune SOPDT_UNDERDAMPED: needs positive zeta and wn",
                ));
            }
            let tau_eff = 1.0 / (zeta * wn).max(1e-6);
            PidGains::pi(tau_eff / (k * (lam + theta)), tau_eff)
        }
    };

    tracing::debug!(model = %kind, %method, lam, kp = gains.kp, ti = gains.ti, "computed gains");
    Ok(gains)
}

/// Store gains in the result's parameter table.
pub fn apply_gains(result: &mut StepIdResult, gains: &PidGains) {
    for (key, value) in gains.entries() {
        result.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result(model: PlantKind, theta_s: Real, params: &[(&str, Real)]) -> StepIdResult {
        StepIdResult {
            model,
            cv0: 0.0,
            cv1: 1.0,
            pv0: 0.0,
            pv1: 1.0,
            du: 1.0,
            dy: 1.0,
            t_step_s: 0.0,
            theta_s,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
            rmse: None,
            n_fit: 0,
            note: String::new(),
        }
    }

    fn close(a: Real, b: Real) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn imc_pid_closed_form() {
        let r = result(PlantKind::Fopdt, 0.0, &[("K", 1.0), ("tau_s", 1.0)]);
        let g = compute_pid_gains(PlantKind::Fopdt, &r, TuningMethod::ImcPid, 1.0).unwrap();
        assert!(close(g.kp, 1.0));
        assert!(close(g.ti, 1.0));
        assert!(close(g.ki, 1.0));
        assert!(close(g.td, 0.0));
        assert!(close(g.kd, 0.0));
    }

    #[test]
    fn imc_pid_with_deadtime() {
        let r = result(PlantKind::Fopdt, 0.2, &[("K", 2.0), ("tau_s", 1.0)]);
        let g = compute_pid_gains(PlantKind::Fopdt, &r, TuningMethod::ImcPid, 0.5).unwrap();
        // Kp = 1.1 / (2 * 0.6), Td = 0.2 / 2.2
        assert!(close(g.kp, 1.1 / 1.2));
        assert!(close(g.ti, 1.1));
        assert!(close(g.td, 0.2 / 2.2));
        assert!(close(g.kd, g.kp * g.td));
    }

    #[test]
    fn fopdt_pi_variants() {
        let r = result(PlantKind::Fopdt, 0.5, &[("K", 2.0), ("tau_s", 10.0)]);
        let imc = compute_pid_gains(PlantKind::Fopdt, &r, TuningMethod::ImcPi, 1.0).unwrap();
        assert!(close(imc.kp, 10.0 / 3.0));
        assert!(close(imc.ti, 10.0));
        assert_eq!(imc.kd, 0.0);

    }

    #[test]
    fn fopdt_simc_pi_uses_imc_pid() {
        let r = result(PlantKind::Fopdt, 0.5, &[("K", 2.0), ("tau_s", 10.0)]);
        let simc = compute_pid_gains(PlantKind::Fopdt, &r, TuningMethod::SimcPi, 1.0).unwrap();
        let pid = compute_pid_gains(PlantKind::Fopdt, &r, TuningMethod::ImcPid, 1.0).unwrap();
        assert_eq!(simc, pid);
        // Kp = 10.25 / (2 * 1.25), Td = 5 / 20.5
        assert!(close(simc.kp, 10.25 / 2.5));
        assert!(close(simc.ti, 10.25));
        assert!(close(simc.td, 5.0 / 20.5));
    }

    #[test]
    fn ipdt_simc_pi() {
        let r = result(PlantKind::Ipdt, 0.5, &[("K", 0.4)]);
        let g = compute_pid_gains(PlantKind::Ipdt, &r, TuningMethod::ImcPid, 1.0).unwrap();
        assert!(close(g.kp, 5.0));
        assert!(close(g.ti, 2.0));
        assert!(close(g.ki, 2.5));
    }

    #[test]
    fn sopdt_effective_time_constant() {
        let r = result(
            PlantKind::SopdtUnderdamped,
            0.0,
            &[("K", 1.0), ("zeta", 0.5), ("wn", 4.0)],
        );
        let g = compute_pid_gains(PlantKind::SopdtUnderdamped, &r, TuningMethod::ImcPi, 1.0)
            .unwrap();
        assert!(close(g.ti, 0.5));
        assert!(close(g.kp, 0.5));

        let missing = result(PlantKind::SopdtUnderdamped, 0.0, &[("K", 1.0)]);
        assert!(
            compute_pid_gains(PlantKind::SopdtUnderdamped, &missing, TuningMethod::ImcPi, 1.0)
                .is_err()
        );
    }

    #[test]
    fn zero_gain_rejected() {
        for kind in [PlantKind::Fopdt, PlantKind::Ipdt, PlantKind::SopdtUnderdamped] {
            let r = result(kind, 0.1, &[("K", 0.0), ("tau_s", 1.0), ("zeta", 0.5), ("wn", 1.0)]);
            let err = compute_pid_gains(kind, &r, TuningMethod::default(), 1.0).unwrap_err();
            assert!(matches!(err, IdentError::Degenerate { .. }));
        }
    }

    #[test]
    fn gains_land_in_params() {
        let mut r = result(PlantKind::Fopdt, 0.0, &[("K", 1.0), ("tau_s", 1.0)]);
        let g = compute_pid_gains(PlantKind::Fopdt, &r, TuningMethod::ImcPid, 1.0).unwrap();
        apply_gains(&mut r, &g);
        assert_eq!(r.get("Kp"), Some(g.kp));
        assert_eq!(r.get("Td"), Some(0.0));
        assert_eq!(r.get("K"), Some(1.0));
    }

    #[test]
    fn method_names() {
        assert_eq!("imc-pi".parse::<TuningMethod>().unwrap(), TuningMethod::ImcPi);
        assert_eq!(TuningMethod::default().to_string(), "IMC_PID");
        assert!("ziegler".parse::<TuningMethod>().is_err());
    }
}

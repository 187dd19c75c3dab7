//! Closed-form step responses of the plant families.
//!
//! These are exact continuous-time curves, used to cross-check the
//! Euler integrators and as a quick preview of a fitted model.

use ck_core::Real;

use crate::plant::PlantModel;

/// Response of `model` to a step of `du` at `t_step_s`, sampled at `t`.
///
/// Output is `pv0` until `t_step_s + theta_s`.
pub fn analytic_step_response(
    t: &[Real],
    model: &PlantModel,
    pv0: Real,
    du: Real,
    t_step_s: Real,
) -> Vec<Real> {
    let t_on = t_step_s + model.theta_s().max(0.0);
    let dy = model.gain() * du;

    t.iter()
        .map(|&t| {
            let tt = t - t_on;
            if tt < 0.0 {
                return pv0;
            }
            let shape = match model {
                PlantModel::Fopdt(p) => 1.0 - (-tt / p.tau_s.max(1e-9)).exp(),
                PlantModel::Ipdt(p) if p.leak_tau_s > 1e-9 => {
                    p.leak_tau_s * (1.0 - (-tt / p.leak_tau_s).exp())
                }
                PlantModel::Ipdt(_) => tt,
                PlantModel::SopdtUnderdamped(p) => {
                    let zeta = p.zeta.clamp(0.0, 0.999);
                    let wn = p.wn.max(1e-6);
                    let root = (1.0 - zeta * zeta).sqrt();
                    let wd = wn * root;
                    let phi = root.atan2(zeta);
                    1.0 - (-zeta * wn * tt).exp() / root * (wd * tt + phi).sin()
                }
            };
            pv0 + dy * shape
        })
        .collect()
}

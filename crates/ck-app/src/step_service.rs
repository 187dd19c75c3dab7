//! Step workflows: simulate an experiment, identify a recorded one.

use std::path::Path;

use ck_core::{Real, StepSeries, StepTuneSelections};
use ck_ident::{PidGains, StepIdResult, apply_gains, compute_pid_gains, identify};
use ck_io::export_step_csv;
use ck_sim::{StepResponse, simulate_step_response};
use serde::Serialize;

use crate::config::{IdentifyConfig, SessionConfig};
use crate::error::AppResult;

/// Simulate the configured step experiment.
pub fn simulate(config: &SessionConfig) -> AppResult<StepResponse> {
    let response = simulate_step_response(&config.step, &config.actuator, &config.plant)?;
    tracing::info!(
        model = %config.plant.kind(),
        samples = response.t.len(),
        "simulated step experiment"
    );
    Ok(response)
}

/// Simulate and write `time,CV,PV` (commanded CV).
pub fn simulate_to_csv(
    config: &SessionConfig,
    path: &Path,
    time_in_ms: bool,
) -> AppResult<StepResponse> {
    let response = simulate(config)?;
    export_step_csv(path, &response.t, &response.cv_cmd, &response.pv, time_in_ms)?;
    Ok(response)
}

/// Identification result with gains and the selections after write-back.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyReport {
    pub result: StepIdResult,
    pub gains: PidGains,
    pub selections: StepTuneSelections,
    #[serde(skip)]
    pub overlay: Vec<Real>,
}

/// Smooth, fit and tune a recorded step experiment.
pub fn identify_step(
    ts: &StepSeries,
    mut selections: StepTuneSelections,
    settings: &IdentifyConfig,
) -> AppResult<IdentifyReport> {
    let working = if settings.smoothing_window > 1 {
        ts.smoothed(settings.smoothing_window)
    } else {
        ts.clone()
    };

    let (mut result, overlay) = identify(&working, &mut selections, settings.model)?;
    let gains = compute_pid_gains(settings.model, &result, settings.method, settings.lambda_s)?;
    apply_gains(&mut result, &gains);

    tracing::info!(
        model = %settings.model,
        method = %settings.method,
        kp = gains.kp,
        ki = gains.ki,
        kd = gains.kd,
        "tuned from step experiment"
    );

    Ok(IdentifyReport {
        result,
        gains,
        selections,
        overlay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ck_sim::{FopdtParams, PlantKind, PlantModel, StepSpec};

    fn config() -> SessionConfig {
        SessionConfig {
            step: StepSpec {
                dt_s: 0.01,
                duration_s: 5.0,
                t_step_s: 1.0,
                cv0: 0.0,
                cv_step: 1.0,
            },
            plant: PlantModel::Fopdt(FopdtParams {
                k: 2.0,
                tau_s: 0.5,
                theta_s: 0.1,
            }),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn simulate_then_identify() {
        let cfg = config();
        let sim = simulate(&cfg).unwrap();
        let ts = StepSeries::new(sim.t, sim.cv_cmd, sim.pv).unwrap();

        let mut sel = StepTuneSelections::default();
        sel.baseline.set(0, 90).unwrap();
        sel.final_span.set(450, 501).unwrap();
        sel.theta.set(110);
        sel.t63.set(160);

        let settings = IdentifyConfig {
            smoothing_window: 1,
            ..IdentifyConfig::default()
        };
        let report = identify_step(&ts, sel, &settings).unwrap();
        assert_eq!(report.result.model, PlantKind::Fopdt);
        assert_eq!(report.selections.t_step.get(), Some(100));
        assert!((report.result.get("K").unwrap() - 2.0).abs() < 0.04);
        assert_eq!(report.result.get("Kp"), Some(report.gains.kp));
        assert_eq!(report.overlay.len(), ts.len());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["result"]["params"]["Kp"].is_number());
        assert!(json.get("overlay").is_none());
    }

    #[test]
    fn smoothing_keeps_raw_pv() {
        let cfg = config();
        let sim = simulate(&cfg).unwrap();
        let ts = StepSeries::new(sim.t, sim.cv_cmd, sim.pv).unwrap();
        let mut sel = StepTuneSelections::default();
        sel.baseline.set(0, 90).unwrap();
        sel.final_span.set(450, 501).unwrap();

        let report = identify_step(&ts, sel, &IdentifyConfig::default()).unwrap();
        assert!(report.result.get("tau_s").unwrap() > 0.0);
        // The caller's series is untouched.
        assert_eq!(ts.pv(), ts.pv_raw());
    }
}

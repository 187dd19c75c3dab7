//! Filter-tuning workflow: span statistics, overrides, filter run.

use std::path::PathBuf;

use ck_core::{SpanSelections, TimeSeries};
use ck_estimation::{
    KalmanConfig, KalmanOutput, TuningResult, compute_tuning, run_kalman, run_kalman_batch,
};
use ck_io::{TimeUnit, load_signal_csv};

use crate::config::SessionConfig;
use crate::error::AppResult;

/// Outcome of one tuning pass over a signal.
#[derive(Debug, Clone)]
pub struct SignalAnalysis {
    pub tuning: TuningResult,
    /// Filter settings actually used; `None` while a noise value is missing.
    pub kalman: Option<KalmanConfig>,
    pub filtered: Option<KalmanOutput>,
}

/// Estimate noise parameters from the marked spans and, when every active
/// value is available, run the filter with them.
pub fn analyze_signal(
    ts: &TimeSeries,
    spans: &SpanSelections,
    config: &SessionConfig,
) -> SignalAnalysis {
    let tuning = compute_tuning(ts, spans);
    let kalman = config
        .overrides
        .resolve(&tuning, config.q_x_convention, &config.kalman);

    let filtered = kalman.as_ref().map(|cfg| run_kalman(ts.t(), ts.x(), cfg));

    match &kalman {
        Some(cfg) => tracing::info!(
            r_x = cfg.r_x,
            q_x = cfg.q_x,
            q_x_dot = cfg.q_x_dot,
            samples = ts.len(),
            "filtered signal"
        ),
        None => tracing::warn!(
            r_x = tuning.r_x,
            q_x_dot = tuning.q_x_dot,
            "noise parameters incomplete; mark spans or set manual values"
        ),
    }

    SignalAnalysis {
        tuning,
        kalman,
        filtered,
    }
}

/// Load several signal files and filter them in parallel with one config.
pub fn filter_files(
    paths: &[PathBuf],
    unit: TimeUnit,
    cfg: &KalmanConfig,
) -> AppResult<Vec<(TimeSeries, KalmanOutput)>> {
    let series = paths
        .iter()
        .map(|p| load_signal_csv(p, unit))
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = run_kalman_batch(&series, cfg);
    tracing::info!(files = series.len(), "filtered batch");
    Ok(series.into_iter().zip(outputs).collect())
}

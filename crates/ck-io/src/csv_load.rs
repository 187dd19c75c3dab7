//! CSV loaders for recorded signals and step experiments.
//!
//! Cells that do not parse as numbers load as NaN; rows with a non-finite
//! entry in a used column are dropped before the series is built.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ck_core::{Real, StepSeries, TimeSeries, stats::median_sample_spacing};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult};

/// Minimum finite rows for a filter-tuning signal.
pub const MIN_SIGNAL_SAMPLES: usize = 10;

const TIME_ALIASES: &[&str] = &["t", "Time", "TIME", "seconds", "sec", "Secs", "s"];
const PV_ALIASES: &[&str] = &[
    "pv", "PV", "y", "Y", "process", "Process", "feedback", "Feedback",
];
const CV_ALIASES: &[&str] = &[
    "CO", "co", "cv", "CV", "u", "U", "command", "Command", "control", "Control", "output",
    "Output", "CO%", "CV%",
];

/// Unit of the time column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "ms")]
    Milliseconds,
}

impl TimeUnit {
    pub fn to_seconds(self, t: Real) -> Real {
        match self {
            Self::Seconds => t,
            Self::Milliseconds => t / 1000.0,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
        })
    }
}

impl FromStr for TimeUnit {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" => Ok(Self::Seconds),
            "ms" => Ok(Self::Milliseconds),
            other => Err(IoError::InvalidArg {
                what: format!("time unit must be 's' or 'ms', got {other:?}"),
            }),
        }
    }
}

/// Column choices for a step-experiment CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct StepCsvOptions {
    pub time_unit: TimeUnit,
    pub time_col: String,
    /// `None` skips the CV column entirely and loads CV as zeros.
    pub cv_col: Option<String>,
    pub pv_col: String,
}

impl Default for StepCsvOptions {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::Seconds,
            time_col: "time".to_string(),
            cv_col: Some("CV".to_string()),
            pv_col: "PV".to_string(),
        }
    }
}

/// Header plus every record of a CSV file, with trimmed cells.
struct Table {
    path: String,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    fn read(path: &Path) -> IoResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)?;
        let headers = rdr.headers()?.clone();
        let rows = rdr.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            path: path.display().to_string(),
            headers,
            rows,
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `primary`, else of the first alias present.
    fn pick(&self, primary: Option<&str>, aliases: &[&str]) -> Option<usize> {
        primary
            .and_then(|p| self.index_of(p))
            .or_else(|| aliases.iter().find_map(|a| self.index_of(a)))
    }

    fn column(&self, index: usize) -> Vec<Real> {
        self.rows
            .iter()
            .map(|r| {
                r.get(index)
                    .and_then(|v| v.parse::<Real>().ok())
                    .unwrap_or(Real::NAN)
            })
            .collect()
    }

    fn missing(&self, column: &'static str) -> IoError {
        IoError::MissingColumn {
            path: self.path.clone(),
            column,
            found: self.headers.iter().collect::<Vec<_>>().join(","),
        }
    }
}

/// Load a `time,x` signal CSV.
///
/// Needs at least ten finite rows and a positive median time step.
pub fn load_signal_csv(path: impl AsRef<Path>, unit: TimeUnit) -> IoResult<TimeSeries> {
    let table = Table::read(path.as_ref())?;
    let ti = table.index_of("time").ok_or_else(|| table.missing("time"))?;
    let xi = table.index_of("x").ok_or_else(|| table.missing("x"))?;

    let (t, x): (Vec<Real>, Vec<Real>) = table
        .column(ti)
        .into_iter()
        .zip(table.column(xi))
        .filter(|(t, x)| t.is_finite() && x.is_finite())
        .map(|(t, x)| (unit.to_seconds(t), x))
        .unzip();

    if t.len() < MIN_SIGNAL_SAMPLES {
        return Err(IoError::InsufficientData {
            path: table.path,
            needed: MIN_SIGNAL_SAMPLES,
            got: t.len(),
        });
    }
    let dt_s = median_sample_spacing(&t);
    if !dt_s.is_finite() || dt_s <= 0.0 {
        return Err(IoError::InvalidTimeStep { path: table.path });
    }

    tracing::debug!(path = %table.path, samples = t.len(), dt_s, "loaded signal CSV");
    Ok(TimeSeries::new(t, x)?.with_source(table.path))
}

/// Load a step-experiment CSV with time, CV and PV columns.
///
/// Columns are matched by the configured name first, then by common aliases.
/// A missing CV column loads as zeros.
pub fn load_step_csv(path: impl AsRef<Path>, opts: &StepCsvOptions) -> IoResult<StepSeries> {
    let table = Table::read(path.as_ref())?;
    let ti = table
        .pick(Some(opts.time_col.as_str()), TIME_ALIASES)
        .ok_or_else(|| table.missing("time"))?;
    let pi = table
        .pick(Some(opts.pv_col.as_str()), PV_ALIASES)
        .ok_or_else(|| table.missing("PV"))?;
    let ci = opts
        .cv_col
        .as_deref()
        .and_then(|c| table.pick(Some(c), CV_ALIASES));

    let t: Vec<Real> = table
        .column(ti)
        .into_iter()
        .map(|t| opts.time_unit.to_seconds(t))
        .collect();
    let pv = table.column(pi);
    let cv = match ci {
        Some(ci) => table.column(ci),
        None => vec![0.0; pv.len()],
    };

    let series = StepSeries::new(t, cv, pv)?.with_source(table.path.clone());
    tracing::debug!(
        path = %table.path,
        samples = series.len(),
        dt_s = series.dt_s(),
        has_cv = ci.is_some(),
        "loaded step CSV"
    );
    Ok(series)
}

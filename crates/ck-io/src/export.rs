//! Span JSON and CSV writers.

use std::fs;
use std::path::Path;

use ck_core::{Real, Span, SpanSelections, TimeSeries};
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult};

/// `[a, b)` as stored in span files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanBounds {
    pub a: usize,
    pub b: usize,
}

/// On-disk form of the filter-tuning spans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpanExport {
    pub source_path: String,
    pub dt_s: Real,
    pub steady: Option<SpanBounds>,
    pub ramp: Option<SpanBounds>,
}

fn bounds(span: &Span) -> Option<SpanBounds> {
    span.as_tuple().map(|(a, b)| SpanBounds { a, b })
}

fn restore(bounds: Option<SpanBounds>) -> IoResult<Span> {
    Ok(match bounds {
        Some(SpanBounds { a, b }) => Span::new(a, b)?,
        None => Span::default(),
    })
}

impl SpanExport {
    pub fn new(ts: &TimeSeries, spans: &SpanSelections) -> Self {
        Self {
            source_path: ts.source_path().to_string(),
            dt_s: ts.dt_s(),
            steady: bounds(&spans.steady),
            ramp: bounds(&spans.ramp),
        }
    }

    /// Overwrite both spans; a `null` entry clears the span.
    ///
    /// Both entries are validated first, so on error `spans` is unchanged.
    pub fn apply_to(&self, spans: &mut SpanSelections) -> IoResult<()> {
        let steady = restore(self.steady)?;
        let ramp = restore(self.ramp)?;
        spans.steady = steady;
        spans.ramp = ramp;
        Ok(())
    }
}

pub fn export_spans_json(
    path: impl AsRef<Path>,
    ts: &TimeSeries,
    spans: &SpanSelections,
) -> IoResult<()> {
    let json = serde_json::to_string_pretty(&SpanExport::new(ts, spans))?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_spans_json(path: impl AsRef<Path>) -> IoResult<SpanExport> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn fmt6(v: Real) -> String {
    format!("{v:.6}")
}

fn time_cell(t_s: Real, time_in_ms: bool) -> String {
    fmt6(if time_in_ms { t_s * 1000.0 } else { t_s })
}

fn check_lengths(what: &str, expected: usize, got: usize) -> IoResult<()> {
    if expected != got {
        return Err(IoError::InvalidArg {
            what: format!("{what} has {got} samples, time has {expected}"),
        });
    }
    Ok(())
}

/// Write `time,CV,PV` rows with six decimals.
pub fn export_step_csv(
    path: impl AsRef<Path>,
    t_s: &[Real],
    cv: &[Real],
    pv: &[Real],
    time_in_ms: bool,
) -> IoResult<()> {
    check_lengths("CV", t_s.len(), cv.len())?;
    check_lengths("PV", t_s.len(), pv.len())?;

    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["time", "CV", "PV"])?;
    for ((t, cv), pv) in t_s.iter().zip(cv).zip(pv) {
        wtr.write_record([time_cell(*t, time_in_ms), fmt6(*cv), fmt6(*pv)])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `time,x` rows with six decimals.
pub fn export_signal_csv(
    path: impl AsRef<Path>,
    t_s: &[Real],
    x: &[Real],
    time_in_ms: bool,
) -> IoResult<()> {
    check_lengths("x", t_s.len(), x.len())?;

    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["time", "x"])?;
    for (t, x) in t_s.iter().zip(x) {
        wtr.write_record([time_cell(*t, time_in_ms), fmt6(*x)])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_spans_serialize_as_null() {
        let ts = TimeSeries::new(vec![0.0, 0.5, 1.0], vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_source("run.csv");
        let mut spans = SpanSelections::default();
        spans.steady.set(0, 2).unwrap();

        let value = serde_json::to_value(SpanExport::new(&ts, &spans)).unwrap();
        assert_eq!(value["source_path"], "run.csv");
        assert_eq!(value["dt_s"], 0.5);
        assert_eq!(value["steady"]["a"], 0);
        assert_eq!(value["steady"]["b"], 2);
        assert!(value["ramp"].is_null());
    }

    #[test]
    fn invalid_bounds_are_rejected_on_apply() {
        let export = SpanExport {
            source_path: String::new(),
            dt_s: 0.1,
            steady: Some(SpanBounds { a: 5, b: 5 }),
            ramp: None,
        };
        let mut spans = SpanSelections::default();
        assert!(matches!(export.apply_to(&mut spans), Err(IoError::Core(_))));
    }

    #[test]
    fn failed_apply_leaves_spans_untouched() {
        let export = SpanExport {
            source_path: String::new(),
            dt_s: 0.1,
            steady: Some(SpanBounds { a: 10, b: 20 }),
            ramp: Some(SpanBounds { a: 40, b: 30 }),
        };
        let mut spans = SpanSelections::default();
        spans.steady.set(0, 5).unwrap();
        spans.ramp.set(6, 9).unwrap();
        let before = spans.clone();

        assert!(export.apply_to(&mut spans).is_err());
        assert_eq!(spans, before);
    }

    #[test]
    fn six_decimal_cells() {
        assert_eq!(fmt6(1.0 / 3.0), "0.333333");
        assert_eq!(time_cell(0.05, true), "50.000000");
    }
}

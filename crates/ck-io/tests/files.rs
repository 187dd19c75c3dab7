use std::fs;
use std::path::PathBuf;

use ck_core::{SpanSelections, TimeSeries};
use ck_io::{
    IoError, SignalSpec, StepCsvOptions, TimeUnit, export_spans_json, export_step_csv,
    generate_signal_csv, load_signal_csv, load_spans_json, load_step_csv,
};

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("ck-io-tests");
    fs::create_dir_all(&dir).unwrap();
    dir.join(format!("{}-{name}", std::process::id()))
}

#[test]
fn span_json_round_trip() {
    let t: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
    let ts = TimeSeries::new(t.clone(), t).unwrap().with_source("ramp.csv");
    let mut spans = SpanSelections::default();
    spans.steady.set(3, 17).unwrap();
    spans.ramp.set(20, 45).unwrap();

    let path = temp_path("spans.json");
    export_spans_json(&path, &ts, &spans).unwrap();
    let loaded = load_spans_json(&path).unwrap();
    assert_eq!(loaded.source_path, "ramp.csv");
    assert!((loaded.dt_s - 0.1).abs() < 1e-12);

    let mut restored = SpanSelections::default();
    loaded.apply_to(&mut restored).unwrap();
    assert_eq!(restored, spans);
    fs::remove_file(path).ok();
}

#[test]
fn generated_signal_loads_back() {
    let path = temp_path("signal.csv");
    let generated = generate_signal_csv(&path, &SignalSpec::default(), false).unwrap();

    let ts = load_signal_csv(&path, TimeUnit::Seconds).unwrap();
    assert_eq!(ts.len(), generated.x.len());
    assert!((ts.dt_s() - 0.05).abs() < 1e-9);
    for (a, b) in ts.x().iter().zip(&generated.x) {
        assert!((a - b).abs() <= 5e-7);
    }
    fs::remove_file(path).ok();
}

#[test]
fn millisecond_time_column() {
    let path = temp_path("signal-ms.csv");
    generate_signal_csv(&path, &SignalSpec::default(), true).unwrap();
    let ts = load_signal_csv(&path, TimeUnit::Milliseconds).unwrap();
    assert!((ts.dt_s() - 0.05).abs() < 1e-9);
    assert!((ts.t()[ts.len() - 1] - 19.95).abs() < 1e-9);
    fs::remove_file(path).ok();
}

#[test]
fn signal_csv_requires_headers_and_samples() {
    let path = temp_path("bad-header.csv");
    fs::write(&path, "t,value\n0,1\n1,2\n").unwrap();
    let err = load_signal_csv(&path, TimeUnit::Seconds).unwrap_err();
    assert!(matches!(err, IoError::MissingColumn { column: "time", .. }));

    fs::write(&path, "time,x\n0,1\n1,2\n2,nan\n3,oops\n").unwrap();
    let err = load_signal_csv(&path, TimeUnit::Seconds).unwrap_err();
    assert!(matches!(err, IoError::InsufficientData { got: 2, .. }));

    let constant_time: String = std::iter::once("time,x\n".to_string())
        .chain((0..12).map(|i| format!("1.0,{i}\n")))
        .collect();
    fs::write(&path, constant_time).unwrap();
    let err = load_signal_csv(&path, TimeUnit::Seconds).unwrap_err();
    assert!(matches!(err, IoError::InvalidTimeStep { .. }));
    fs::remove_file(path).ok();
}

#[test]
fn step_csv_round_trip_and_aliases() {
    let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
    let cv: Vec<f64> = (0..20).map(|i| if i >= 4 { 5.0 } else { 0.0 }).collect();
    let pv: Vec<f64> = (0..20).map(|i| (i as f64 - 4.0).max(0.0) * 0.5).collect();

    let path = temp_path("step.csv");
    export_step_csv(&path, &t, &cv, &pv, false).unwrap();
    let ts = load_step_csv(&path, &StepCsvOptions::default()).unwrap();
    assert_eq!(ts.len(), 20);
    assert_eq!(ts.cv()[4], 5.0);
    assert_eq!(ts.pv()[10], 3.0);
    assert!((ts.dt_s() - 0.25).abs() < 1e-12);

    fs::write(
        &path,
        "Secs, CO%, feedback\n0,0,1\n1,0,1\n2,1,1\n3,1,2\n4,1,3\n5,1,3\n",
    )
    .unwrap();
    let ts = load_step_csv(&path, &StepCsvOptions::default()).unwrap();
    assert_eq!(ts.cv(), &[0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    assert_eq!(ts.pv()[4], 3.0);
    fs::remove_file(path).ok();
}

#[test]
fn step_csv_without_cv_and_in_ms() {
    let path = temp_path("step-nocv.csv");
    fs::write(&path, "time,y\n0,0\n100,0\n200,1\n300,2\nbad,3\n400,2\n500,2\n").unwrap();
    let opts = StepCsvOptions {
        time_unit: TimeUnit::Milliseconds,
        cv_col: None,
        ..StepCsvOptions::default()
    };
    let ts = load_step_csv(&path, &opts).unwrap();
    assert_eq!(ts.len(), 6);
    assert!(ts.cv().iter().all(|&c| c == 0.0));
    assert!((ts.dt_s() - 0.1).abs() < 1e-12);
    fs::remove_file(path).ok();
}

#[test]
fn mismatched_export_lengths() {
    let path = temp_path("mismatch.csv");
    let err = export_step_csv(&path, &[0.0, 1.0], &[0.0], &[0.0, 1.0], false).unwrap_err();
    assert!(matches!(err, IoError::InvalidArg { .. }));
}

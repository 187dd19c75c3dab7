use std::fs;
use std::path::PathBuf;

use ck_app::{SessionConfig, filter_files, load_config, save_config, simulate_to_csv};
use ck_core::StepTuneSelections;
use ck_io::{SignalSpec, StepCsvOptions, TimeUnit, generate_signal_csv, load_step_csv};
use ck_sim::{IpdtParams, PlantKind, PlantModel};

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("ck-app-tests");
    fs::create_dir_all(&dir).unwrap();
    dir.join(format!("{}-{name}", std::process::id()))
}

#[test]
fn config_round_trips_in_both_formats() {
    let mut cfg = SessionConfig::default();
    cfg.plant = PlantModel::Ipdt(IpdtParams {
        k: 0.25,
        theta_s: 0.4,
        leak_tau_s: 0.0,
    });
    cfg.actuator.pv_max = Some(80.0);
    cfg.kalman = cfg.kalman.with_bleed(0.5, 0.9);
    cfg.identify.model = PlantKind::Ipdt;

    for name in ["session.yaml", "session.json"] {
        let path = temp_path(name);
        save_config(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg, "{name}");
        fs::remove_file(path).ok();
    }
}

#[test]
fn unreadable_config_is_reported() {
    let path = temp_path("missing.yaml");
    assert!(load_config(&path).is_err());

    fs::write(&path, "step: [1, 2").unwrap();
    assert!(load_config(&path).is_err());
    fs::remove_file(path).ok();
}

#[test]
fn simulated_csv_identifies_back() {
    let mut cfg = SessionConfig::default();
    cfg.step.dt_s = 0.01;
    cfg.step.cv_step = 1.0;

    let path = temp_path("step.csv");
    simulate_to_csv(&cfg, &path, false).unwrap();
    let ts = load_step_csv(&path, &StepCsvOptions::default()).unwrap();
    assert_eq!(ts.len(), 501);

    let mut sel = StepTuneSelections::default();
    sel.baseline.set(0, 90).unwrap();
    sel.final_span.set(450, 501).unwrap();
    cfg.identify.smoothing_window = 1;
    let report = ck_app::identify_step(&ts, sel, &cfg.identify).unwrap();
    // Default plant: K = 1.
    assert!((report.result.get("K").unwrap() - 1.0).abs() < 1e-3);
    assert!(report.selections.t_dead.is_valid());
    fs::remove_file(path).ok();
}

#[test]
fn batch_filter_over_files() {
    let a = temp_path("batch-a.csv");
    let b = temp_path("batch-b.csv");
    generate_signal_csv(&a, &SignalSpec::default(), false).unwrap();
    generate_signal_csv(
        &b,
        &SignalSpec {
            seed: 99,
            ..SignalSpec::default()
        },
        false,
    )
    .unwrap();

    let cfg = SessionConfig::default().kalman;
    let out = filter_files(&[a.clone(), b.clone()], TimeUnit::Seconds, &cfg).unwrap();
    assert_eq!(out.len(), 2);
    for (ts, filtered) in &out {
        assert_eq!(filtered.value.len(), ts.len());
    }
    fs::remove_file(a).ok();
    fs::remove_file(b).ok();
}

#[test]
fn selections_json_rejects_inverted_span() {
    let mut sel = StepTuneSelections::default();
    sel.baseline.set(0, 90).unwrap();
    sel.peak.set(140);
    let json = serde_json::to_string(&sel).unwrap();
    assert_eq!(serde_json::from_str::<StepTuneSelections>(&json).unwrap(), sel);

    let bad = json.replace("[0,90]", "[90,0]");
    assert_ne!(bad, json);
    assert!(serde_json::from_str::<StepTuneSelections>(&bad).is_err());
}

use ck_sim::{
    ActuatorParams, FopdtParams, IpdtParams, PlantModel, StepSpec, simulate_step_response,
};
use proptest::prelude::*;

fn fopdt(k: f64, tau_s: f64, theta_s: f64) -> PlantModel {
    PlantModel::Fopdt(FopdtParams { k, tau_s, theta_s })
}

#[test]
fn fopdt_step_without_limits() {
    let spec = StepSpec {
        dt_s: 0.05,
        duration_s: 5.0,
        t_step_s: 1.0,
        cv0: 0.0,
        cv_step: 10.0,
    };
    let res = simulate_step_response(&spec, &ActuatorParams::default(), &fopdt(1.0, 0.3, 0.2))
        .unwrap();

    assert_eq!(res.t.len(), 101);
    assert_eq!(res.cv_cmd, res.cv_eff);

    // Step at 1.0 s plus 0.2 s dead time: nothing moves before 1.2 s.
    for (t, pv) in res.t.iter().zip(&res.pv) {
        if *t < 1.2 - 1e-9 {
            assert_eq!(*pv, 0.0, "pv moved at t={t}");
        }
    }
    assert!(res.pv.windows(2).all(|w| w[1] >= w[0]));
    let last = *res.pv.last().unwrap();
    assert!(last < 10.0 + 1e-9);
    assert!((last - 10.0).abs() < 1e-3, "final pv {last}");
}

#[test]
fn rate_limited_actuator_slows_the_response() {
    let spec = StepSpec::default();
    let model = fopdt(1.0, 0.3, 0.0);
    let free = simulate_step_response(&spec, &ActuatorParams::default(), &model).unwrap();
    let limited = simulate_step_response(
        &spec,
        &ActuatorParams {
            rate_limit: 5.0,
            ..ActuatorParams::default()
        },
        &model,
    )
    .unwrap();

    // 0.25 per sample from the step sample at t = 1.0 s.
    let i = 30;
    assert!((limited.cv_eff[i] - 2.75).abs() < 1e-9);
    assert!(limited.pv[i] < free.pv[i]);
}

#[test]
fn saturation_caps_the_plant_input() {
    let spec = StepSpec::default();
    let act = ActuatorParams {
        pv_max: Some(4.0),
        ..ActuatorParams::default()
    };
    let res = simulate_step_response(&spec, &act, &fopdt(2.0, 0.2, 0.0)).unwrap();
    assert!(res.cv_eff.iter().all(|&v| v <= 4.0));
    assert!((res.pv.last().unwrap() - 8.0).abs() < 1e-3);
}

#[test]
fn ipdt_ramps_after_deadtime() {
    let spec = StepSpec {
        cv_step: 2.0,
        ..StepSpec::default()
    };
    let model = PlantModel::Ipdt(IpdtParams {
        k: 0.4,
        theta_s: 0.3,
        leak_tau_s: 0.0,
    });
    let res = simulate_step_response(&spec, &ActuatorParams::default(), &model).unwrap();
    // Slope K * du = 0.8 per second once running.
    let slope = (res.pv[100] - res.pv[80]) / (res.t[100] - res.t[80]);
    assert!((slope - 0.8).abs() < 1e-9);
}

proptest! {
    #[test]
    fn simulation_is_deterministic(
        k in 0.1f64..5.0,
        tau in 0.05f64..2.0,
        theta in 0.0f64..1.0,
        cv_step in -20.0f64..20.0,
    ) {
        let spec = StepSpec { cv_step, ..StepSpec::default() };
        let model = fopdt(k, tau, theta);
        let a = simulate_step_response(&spec, &ActuatorParams::default(), &model).unwrap();
        let b = simulate_step_response(&spec, &ActuatorParams::default(), &model).unwrap();
        prop_assert_eq!(a, b);
    }
}

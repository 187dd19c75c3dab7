use std::path::{Path, PathBuf};

use ck_app::{AppError, AppResult, SessionConfig, identify_step, load_config, save_config};
use ck_core::{Real, SpanSelections, StepTuneSelections};
use ck_ident::TuningMethod;
use ck_io::{
    RampHoldProfile, SignalSpec, StepCsvOptions, TimeUnit, export_signal_csv, export_spans_json,
    generate_signal_csv, load_signal_csv, load_spans_json, load_step_csv,
};
use ck_sim::PlantKind;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ck-cli")]
#[command(about = "ctrlkit CLI - Kalman tuning and step-response identification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest Kalman noise parameters from marked spans and filter the signal
    Tune {
        /// Signal CSV with `time,x` columns
        csv: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
        /// Steady span as A:B (sample indices, end exclusive)
        #[arg(long, value_parser = parse_span)]
        steady: Option<(usize, usize)>,
        /// Ramp span as A:B
        #[arg(long, value_parser = parse_span)]
        ramp: Option<(usize, usize)>,
        /// Load spans from a JSON file (flags above take precedence)
        #[arg(long)]
        spans: Option<PathBuf>,
        /// Save the spans used to a JSON file
        #[arg(long)]
        export_spans: Option<PathBuf>,
        /// Write the filtered signal as `time,x`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Filter several signal CSVs with the configured Kalman settings
    Filter {
        /// Signal CSVs with `time,x` columns
        #[arg(required = true)]
        csvs: Vec<PathBuf>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Simulate the configured step experiment
    Simulate {
        /// Session config (YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write `time,CV,PV` to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the time column in milliseconds
        #[arg(long)]
        ms: bool,
    },
    /// Identify a plant model from a recorded step and derive PID gains
    Identify(IdentifyArgs),
    /// Generate a noisy ramp-hold test signal
    GenerateSignal {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 50)]
        dt_ms: u64,
        #[arg(long, default_value_t = 20)]
        seconds: u64,
        #[arg(long, default_value_t = 10.0)]
        noise_amp: Real,
        #[arg(long, default_value_t = 12345)]
        seed: u64,
        /// Write the time column in milliseconds
        #[arg(long)]
        ms: bool,
    },
    /// Write a default session config
    InitConfig {
        /// Output path; `.json` selects JSON, anything else YAML
        path: PathBuf,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Unit of the CSV time column
    #[arg(long, default_value = "s")]
    time_unit: TimeUnit,
    /// Session config (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct IdentifyArgs {
    /// Step CSV with time, CV and PV columns
    csv: PathBuf,
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_parser = parse_span)]
    baseline: (usize, usize),
    #[arg(long = "final", value_parser = parse_span)]
    final_span: Option<(usize, usize)>,
    #[arg(long, value_parser = parse_span)]
    fit: Option<(usize, usize)>,
    #[arg(long, value_parser = parse_span)]
    slope: Option<(usize, usize)>,
    /// Step index (auto-detected when omitted)
    #[arg(long)]
    step: Option<usize>,
    /// Dead-time end index (auto-detected when omitted)
    #[arg(long)]
    theta: Option<usize>,
    #[arg(long)]
    t63: Option<usize>,
    #[arg(long)]
    peak: Option<usize>,
    /// FOPDT, IPDT or SOPDT_UNDERDAMPED
    #[arg(long)]
    model: Option<PlantKind>,
    /// IMC_PID, IMC_PI or SIMC_PI
    #[arg(long)]
    method: Option<TuningMethod>,
    /// Closed-loop time constant (seconds)
    #[arg(long)]
    lambda: Option<Real>,
    /// PV moving-average window
    #[arg(long)]
    smooth: Option<usize>,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tune {
            csv,
            common,
            steady,
            ramp,
            spans,
            export_spans,
            output,
        } => cmd_tune(
            &csv,
            &common,
            steady,
            ramp,
            spans.as_deref(),
            export_spans.as_deref(),
            output.as_deref(),
        ),
        Commands::Filter { csvs, common } => cmd_filter(&csvs, &common),
        Commands::Simulate { config, output, ms } => {
            cmd_simulate(config.as_deref(), output.as_deref(), ms)
        }
        Commands::Identify(args) => cmd_identify(&args),
        Commands::GenerateSignal {
            output,
            dt_ms,
            seconds,
            noise_amp,
            seed,
            ms,
        } => {
            let spec = SignalSpec {
                dt_ms,
                seconds,
                profile: RampHoldProfile::default(),
                noise_amp,
                seed,
            };
            cmd_generate_signal(&output, &spec, ms)
        }
        Commands::InitConfig { path } => cmd_init_config(&path),
    }
}

fn parse_span(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected A:B, got {s:?}"))?;
    let a: usize = a.trim().parse().map_err(|e| format!("span start: {e}"))?;
    let b: usize = b.trim().parse().map_err(|e| format!("span end: {e}"))?;
    if b <= a {
        return Err(format!("span end must exceed start ({a}:{b})"));
    }
    Ok((a, b))
}

fn session(path: Option<&Path>) -> AppResult<SessionConfig> {
    match path {
        Some(p) => load_config(p),
        None => Ok(SessionConfig::default()),
    }
}

fn fmt_value(v: Real) -> String {
    if v.is_finite() {
        format!("{v:.6e}")
    } else {
        "-".to_string()
    }
}

fn cmd_tune(
    csv: &Path,
    common: &CommonArgs,
    steady: Option<(usize, usize)>,
    ramp: Option<(usize, usize)>,
    spans_in: Option<&Path>,
    spans_out: Option<&Path>,
    output: Option<&Path>,
) -> AppResult<()> {
    let config = session(common.config.as_deref())?;
    let ts = load_signal_csv(csv, common.time_unit)?;
    println!("Loaded {} samples from {} (dt = {:.6} s)", ts.len(), csv.display(), ts.dt_s());

    let mut spans = SpanSelections::default();
    if let Some(path) = spans_in {
        load_spans_json(path)?.apply_to(&mut spans)?;
    }
    if let Some((a, b)) = steady {
        spans.steady.set(a, b)?;
    }
    if let Some((a, b)) = ramp {
        spans.ramp.set(a, b)?;
    }

    let analysis = ck_app::analyze_signal(&ts, &spans, &config);
    let t = &analysis.tuning;
    println!("Suggested noise parameters:");
    println!("  r_x            {}", fmt_value(t.r_x));
    println!("  sigma_x        {}", fmt_value(t.sigma_x));
    println!("  q_x_dot        {} ({} second differences)", fmt_value(t.q_x_dot), t.dv_count);
    println!("  q_x (user)     {}", fmt_value(t.q_x_user));
    println!("  q_x (consist.) {}", fmt_value(t.q_x_consistent));
    println!("  q_xv (consist.) {}", fmt_value(t.q_xv_consistent));

    if let Some(path) = spans_out {
        export_spans_json(path, &ts, &spans)?;
        println!("✓ Spans written to {}", path.display());
    }

    match (&analysis.kalman, &analysis.filtered) {
        (Some(cfg), Some(out)) => {
            println!(
                "✓ Filtered with r_x={}, q_x={}, q_x_dot={}",
                fmt_value(cfg.r_x),
                fmt_value(cfg.q_x),
                fmt_value(cfg.q_x_dot)
            );
            if out.skipped_updates > 0 || out.passthroughs > 0 {
                println!(
                    "  {} skipped updates, {} pass-through samples",
                    out.skipped_updates, out.passthroughs
                );
            }
            if let Some(path) = output {
                export_signal_csv(path, ts.t(), &out.value, false)?;
                println!("✓ Filtered signal written to {}", path.display());
            }
        }
        _ => {
            if output.is_some() {
                return Err(AppError::InvalidInput(
                    "cannot filter: mark steady and ramp spans or enable manual values"
                        .to_string(),
                ));
            }
            println!("Filter not run: noise parameters incomplete");
        }
    }
    Ok(())
}

fn cmd_filter(csvs: &[PathBuf], common: &CommonArgs) -> AppResult<()> {
    let config = session(common.config.as_deref())?;
    let results = ck_app::filter_files(csvs, common.time_unit, &config.kalman)?;
    for (path, (ts, out)) in csvs.iter().zip(&results) {
        let last = out.value.last().copied().unwrap_or(Real::NAN);
        println!(
            "  {}: {} samples, final value {:.6}, {} skipped updates",
            path.display(),
            ts.len(),
            last,
            out.skipped_updates
        );
    }
    Ok(())
}

fn cmd_simulate(config: Option<&Path>, output: Option<&Path>, ms: bool) -> AppResult<()> {
    let config = session(config)?;
    println!(
        "Simulating {} step: dt = {:.3} s, duration = {:.3} s",
        config.plant.kind(),
        config.step.dt_s,
        config.step.duration_s
    );
    let response = match output {
        Some(path) => {
            let r = ck_app::simulate_to_csv(&config, path, ms)?;
            println!("✓ Step response written to {}", path.display());
            r
        }
        None => ck_app::simulate(&config)?,
    };
    if let (Some(t), Some(pv)) = (response.t.last(), response.pv.last()) {
        println!("  {} samples, PV({t:.3} s) = {pv:.6}", response.t.len());
    }
    Ok(())
}

fn cmd_identify(args: &IdentifyArgs) -> AppResult<()> {
    let config = session(args.common.config.as_deref())?;
    let mut settings = config.identify.clone();
    if let Some(model) = args.model {
        settings.model = model;
    }
    if let Some(method) = args.method {
        settings.method = method;
    }
    if let Some(lambda) = args.lambda {
        settings.lambda_s = lambda;
    }
    if let Some(win) = args.smooth {
        settings.smoothing_window = win;
    }

    let opts = StepCsvOptions {
        time_unit: args.common.time_unit,
        ..StepCsvOptions::default()
    };
    let ts = load_step_csv(&args.csv, &opts)?;

    let mut sel = StepTuneSelections::default();
    sel.baseline.set(args.baseline.0, args.baseline.1)?;
    for (span, bounds) in [
        (&mut sel.final_span, args.final_span),
        (&mut sel.fit, args.fit),
        (&mut sel.slope, args.slope),
    ] {
        if let Some((a, b)) = bounds {
            span.set(a, b)?;
        }
    }
    for (point, index) in [
        (&mut sel.t_step, args.step),
        (&mut sel.theta, args.theta),
        (&mut sel.t63, args.t63),
        (&mut sel.peak, args.peak),
    ] {
        if let Some(i) = index {
            point.set(i);
        }
    }

    let report = identify_step(&ts, sel, &settings)?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::InvalidInput(format!("Failed to serialize report: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    let r = &report.result;
    println!("Identified {} from {}", r.model, args.csv.display());
    println!("  du = {:.6}, dy = {:.6}", r.du, r.dy);
    println!("  t_step = {:.4} s, theta = {:.4} s", r.t_step_s, r.theta_s);
    for (key, value) in &r.params {
        println!("  {key:<6} {value:.6}");
    }
    match r.rmse {
        Some(rmse) => println!("  RMSE = {rmse:.6} over {} samples", r.n_fit),
        None => println!("  RMSE unavailable"),
    }
    if !r.note.is_empty() {
        println!("  note: {}", r.note);
    }
    Ok(())
}

fn cmd_generate_signal(output: &Path, spec: &SignalSpec, ms: bool) -> AppResult<()> {
    let signal = generate_signal_csv(output, spec, ms)?;
    println!(
        "✓ Wrote {} samples to {} (seed {})",
        signal.x.len(),
        output.display(),
        spec.seed
    );
    Ok(())
}

fn cmd_init_config(path: &Path) -> AppResult<()> {
    save_config(path, &SessionConfig::default())?;
    println!("✓ Default config written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_argument() {
        assert_eq!(parse_span("3:17"), Ok((3, 17)));
        assert_eq!(parse_span(" 0 : 5 "), Ok((0, 5)));
        assert!(parse_span("5:5").is_err());
        assert!(parse_span("5").is_err());
        assert!(parse_span("a:9").is_err());
    }

    #[test]
    fn cli_parses_identify() {
        let cli = Cli::try_parse_from([
            "ck-cli", "identify", "run.csv", "--baseline", "0:90", "--final", "450:501",
            "--model", "sopdt", "--method", "IMC_PI", "--time-unit", "ms",
        ])
        .unwrap();
        match cli.command {
            Commands::Identify(args) => {
                assert_eq!(args.baseline, (0, 90));
                assert_eq!(args.final_span, Some((450, 501)));
                assert_eq!(args.model, Some(PlantKind::SopdtUnderdamped));
                assert_eq!(args.method, Some(TuningMethod::ImcPi));
                assert_eq!(args.common.time_unit, TimeUnit::Milliseconds);
            }
            _ => panic!("expected identify"),
        }
    }
}

//! File formats for ctrlkit: CSV loading and export, span JSON and the
//! ramp-hold test-signal generator.

pub mod csv_load;
pub mod error;
pub mod export;
pub mod generator;

pub use csv_load::{StepCsvOptions, TimeUnit, load_signal_csv, load_step_csv};
pub use error::{IoError, IoResult};
pub use export::{
    SpanBounds, SpanExport, export_signal_csv, export_spans_json, export_step_csv,
    load_spans_json,
};
pub use generator::{
    GeneratedSignal, RampHoldProfile, SignalSpec, generate_signal, generate_signal_csv,
    ramp_hold_value,
};

//! Step-response identification for ctrlkit.
//!
//! Fits FOPDT, IPDT and underdamped SOPDT models to a recorded step
//! experiment and derives PI/PID gains from the fitted model.

pub mod detect;
pub mod error;
pub mod identify;
pub mod result;
pub mod rules;

pub use detect::{auto_detect_deadtime_index, auto_detect_step_index};
pub use error::{IdentError, IdentResult};
pub use identify::identify;
pub use result::StepIdResult;
pub use rules::{PidGains, TuningMethod, apply_gains, compute_pid_gains};

//! Shared service layer for ctrlkit frontends.
//!
//! Wraps the analysis crates into the two workflows a frontend drives:
//! filter tuning on a recorded signal, and step simulation/identification.

pub mod config;
pub mod error;
pub mod step_service;
pub mod tuning_service;

pub use config::{ConfigFormat, IdentifyConfig, SessionConfig, load_config, save_config};
pub use error::{AppError, AppResult};
pub use step_service::{IdentifyReport, identify_step, simulate, simulate_to_csv};
pub use tuning_service::{SignalAnalysis, analyze_signal, filter_files};

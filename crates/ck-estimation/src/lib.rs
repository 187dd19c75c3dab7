//! Signal estimation for ctrlkit.
//!
//! Provides:
//! - A two-state (value, rate) Kalman filter run over a captured series
//! - Span-based suggestions for the filter noise covariances
//! - Manual overrides that merge with those suggestions into a filter config

pub mod kalman;
pub mod tuning;

pub use kalman::{
    BleedOff, Covariance, KalmanConfig, KalmanFilter, KalmanOutput, run_kalman, run_kalman_batch,
};
pub use tuning::{QxConvention, TuningOverrides, TuningResult, compute_tuning};

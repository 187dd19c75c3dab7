//! Error types for identification and tuning rules.

use ck_core::CoreError;
use ck_sim::SimError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentError {
    #[error("Insufficient data for {what}: need {needed}, got {got}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Degenerate input: {what}")]
    Degenerate { what: String },

    #[error("Geometry error: {what}")]
    Geometry { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),
}

pub type IdentResult<T> = Result<T, IdentError>;

impl IdentError {
    pub(crate) fn degenerate(what: impl Into<String>) -> Self {
        Self::Degenerate { what: what.into() }
    }
}

//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while setting up a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown plant model: {name}")]
    UnknownModel { name: String },
}

pub type SimResult<T> = Result<T, SimError>;

//! Error types for the ck-app service layer.

use std::path::PathBuf;

/// Unified error for CLI and other frontends; backend errors are carried as
/// their rendered messages.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Identification error: {0}")]
    Identification(String),
}

/// Result type for ck-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ck_core::CoreError> for AppError {
    fn from(err: ck_core::CoreError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<ck_io::IoError> for AppError {
    fn from(err: ck_io::IoError) -> Self {
        AppError::Data(err.to_string())
    }
}

impl From<ck_sim::SimError> for AppError {
    fn from(err: ck_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<ck_ident::IdentError> for AppError {
    fn from(err: ck_ident::IdentError) -> Self {
        AppError::Identification(err.to_string())
    }
}

use ck_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path}: missing {column} column (found: {found})")]
    MissingColumn {
        path: String,
        column: &'static str,
        found: String,
    },

    #[error("{path}: not enough valid samples (need {needed}, got {got})")]
    InsufficientData {
        path: String,
        needed: usize,
        got: usize,
    },

    #[error("{path}: could not determine a positive dt from the time column")]
    InvalidTimeStep { path: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type IoResult<T> = Result<T, IoError>;

//! Session configuration file (YAML or JSON).

use std::path::Path;

use ck_core::Real;
use ck_estimation::{KalmanConfig, QxConvention, TuningOverrides};
use ck_ident::TuningMethod;
use ck_sim::{ActuatorParams, PlantKind, PlantModel, StepSpec};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Identification and tuning-rule settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyConfig {
    pub model: PlantKind,
    pub method: TuningMethod,
    pub lambda_s: Real,
    /// Moving-average window applied to PV before fitting; `<= 1` disables it.
    pub smoothing_window: usize,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            model: PlantKind::Fopdt,
            method: TuningMethod::ImcPid,
            lambda_s: 1.0,
            smoothing_window: 9,
        }
    }
}

/// Everything a session needs besides the data files. Missing sections
/// take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub kalman: KalmanConfig,
    pub overrides: TuningOverrides,
    pub q_x_convention: QxConvention,
    pub step: StepSpec,
    pub actuator: ActuatorParams,
    pub plant: PlantModel,
    pub identify: IdentifyConfig,
}

impl SessionConfig {
    pub fn validate(&self) -> AppResult<()> {
        self.kalman
            .validate()
            .map_err(|e| AppError::Config(format!("kalman: {e}")))?;
        self.step
            .validate()
            .map_err(|e| AppError::Config(format!("step: {e}")))?;
        self.actuator
            .validate()
            .map_err(|e| AppError::Config(format!("actuator: {e}")))?;
        if !(self.identify.lambda_s.is_finite() && self.identify.lambda_s > 0.0) {
            return Err(AppError::Config(
                "identify.lambda_s must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// `.json` files are JSON; anything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Load and validate a session config.
pub fn load_config(path: &Path) -> AppResult<SessionConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: SessionConfig = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config JSON: {}", e)))?,
        ConfigFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?,
    };
    config.validate()?;

    tracing::debug!(path = %path.display(), "loaded session config");
    Ok(config)
}

/// Write a session config in the format implied by the extension.
pub fn save_config(path: &Path, config: &SessionConfig) -> AppResult<()> {
    let content = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?,
    };

    std::fs::write(path, content).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

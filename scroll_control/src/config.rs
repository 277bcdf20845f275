//! Timing and sensitivity configuration for the control loop.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sample::Sensitivity;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("sensitivity {0} outside {min}..={max}", min = Sensitivity::MIN, max = Sensitivity::MAX)]
    Sensitivity(i64),

    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
}

/// Control-loop settings.  Every field has a default, so a config file only
/// needs the keys it wants to change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Period of the sampling loop.
    pub sample_interval_ms: u64,
    /// How long one classification may stay outstanding.
    pub classify_timeout_ms: u64,
    /// Initial sensitivity, `5..=30`.
    pub sensitivity: i64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            sample_interval_ms:  600,
            classify_timeout_ms: 1500,
            sensitivity:         Sensitivity::DEFAULT as i64,
        }
    }
}

impl ControlConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: ControlConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration { name: "sample_interval_ms" });
        }
        if self.classify_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration { name: "classify_timeout_ms" });
        }
        self.sensitivity()?;
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    pub fn sensitivity(&self) -> Result<Sensitivity, ConfigError> {
        i32::try_from(self.sensitivity)
            .ok()
            .and_then(Sensitivity::try_new)
            .ok_or(ConfigError::Sensitivity(self.sensitivity))
    }
}

//! Configuration for the forecasting pipeline
//!
//! Layered loading, later layers winning:
//! 1. Defaults from the `Default` impls
//! 2. Optional TOML file (`config.toml` unless told otherwise)
//! 3. Environment overrides with the `WEATHER__` prefix, e.g.
//!    `WEATHER__TRAINING__MIN_ROWS=50`

use crate::error::Result;
use crate::features::FeatureConfig;
use crate::ml::EnsembleParams;
use crate::registry::RegistryConfig;
use crate::training::TrainingConfig;
use crate::validation::ValidationThresholds;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature pipeline parameters
    pub features: FeatureConfig,
    /// Hyperparameters of the three ensemble members
    pub ensemble: EnsembleParams,
    /// Split and minimum-size settings
    pub training: TrainingConfig,
    /// Registry location and stages
    pub registry: RegistryConfig,
    /// Gate thresholds for CI validation
    pub validation: ValidationThresholds,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load defaults, then `path` if it exists, then `WEATHER__*` variables
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("WEATHER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

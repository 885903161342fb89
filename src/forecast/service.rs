//! Serving facade over the registry
//!
//! Loads the serving-stage artifact once. When nothing can be loaded the
//! service stays up in degraded mode and answers with a labelled
//! persistence forecast instead of model output.

use super::{forecast_from_history, persistence_forecast};
use crate::error::{ForecastError, Result};
use crate::registry::{LoadedModel, ModelRegistry, Stage};
use crate::types::{ForecastDay, WeatherRecord};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Where a served forecast came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastSource {
    Model { version: u32, run_id: Uuid },
    /// No model loaded; seed values carried forward
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedForecast {
    pub source: ForecastSource,
    pub days: Vec<ForecastDay>,
}

pub struct ForecastService {
    model: Option<LoadedModel>,
}

impl ForecastService {
    /// Load the newest artifact at `stage`, degrading on any failure
    pub fn from_registry(registry: &ModelRegistry, stage: Stage) -> Self {
        match registry.load_latest(stage) {
            Ok(model) => {
                info!(
                    version = model.entry.version,
                    run_id = %model.entry.run_id,
                    %stage,
                    "Forecast model loaded"
                );
                Self::with_model(model)
            }
            Err(e @ ForecastError::StageNotFound(_)) => {
                warn!(error = %e, "No model to serve, using fallback forecasts");
                Self::degraded()
            }
            Err(e) => {
                error!(error = %e, %stage, "Failed to load forecast model, using fallback forecasts");
                Self::degraded()
            }
        }
    }

    pub fn with_model(model: LoadedModel) -> Self {
        Self { model: Some(model) }
    }

    pub fn degraded() -> Self {
        Self { model: None }
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_version(&self) -> Option<u32> {
        self.model.as_ref().map(|m| m.entry.version)
    }

    pub fn forecast(&self, seed: &WeatherRecord, horizon: usize) -> Result<ServedForecast> {
        self.forecast_from_history(std::slice::from_ref(seed), horizon)
    }

    pub fn forecast_from_history(&self, history: &[WeatherRecord], horizon: usize) -> Result<ServedForecast> {
        match &self.model {
            Some(model) => Ok(ServedForecast {
                source: ForecastSource::Model {
                    version: model.entry.version,
                    run_id: model.entry.run_id,
                },
                days: forecast_from_history(&model.artifact, history, horizon)?,
            }),
            None => {
                let seed = history.last().ok_or(ForecastError::InsufficientData {
                    required: 1,
                    actual: 0,
                })?;
                Ok(ServedForecast {
                    source: ForecastSource::Fallback,
                    days: persistence_forecast(seed, horizon)?,
                })
            }
        }
    }
}

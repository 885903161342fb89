//! Feature engineering for daily weather series
//!
//! Turns raw daily records into a numeric frame in a fixed stage order:
//! - Temporal: calendar fields plus sine/cosine encodings
//! - Lag: shifted copies of the weather columns
//! - Rolling: trailing mean/std/max/min windows
//! - Derived indices: heat index, temperature range/average, wind chill
//!
//! Configuration is an immutable [`FeatureConfig`] passed into every call,
//! so concurrent training and forecast runs never share engineer state.

mod frame;
mod indices;
mod temporal;
mod window;


pub use frame::FeatureFrame;
pub use indices::{heat_index, wind_chill};
pub use window::{lagged, rolling, RollingStat};

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of the feature pipeline, frozen into every trained artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Weather columns that receive lag and rolling features
    pub weather_columns: Vec<String>,
    /// Lag offsets in days
    pub lags: Vec<usize>,
    /// Trailing rolling windows in days
    pub rolling_windows: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            weather_columns: [
                "temp_max",
                "temp_min",
                "humidity",
                "pressure",
                "wind_speed",
                "precipitation",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            lags: vec![1, 2, 3, 7],
            rolling_windows: vec![3, 7, 14],
        }
    }
}

impl FeatureConfig {
    /// Largest lag or window, in days
    pub fn lookback(&self) -> usize {
        self.lags
            .iter()
            .chain(&self.rolling_windows)
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Shortest input that still yields at least one fully defined row
    pub fn min_history(&self) -> usize {
        self.lookback() + 1
    }

    /// Leading rows left undefined by the lag and rolling stages
    #[cfg(test)]
    pub(crate) fn warmup_rows(&self) -> usize {
        let max_lag = self.lags.iter().copied().max().unwrap_or(0);
        let max_window = self.rolling_windows.iter().copied().max().unwrap_or(1);
        max_lag.max(max_window.saturating_sub(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.lags.iter().any(|&lag| lag == 0) {
            return Err(ForecastError::InvalidParameter(
                "lag offsets must be at least 1 day".to_string(),
            ));
        }
        if self.rolling_windows.iter().any(|&w| w < 2) {
            return Err(ForecastError::InvalidParameter(
                "rolling windows must span at least 2 days".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run every stage without dropping rows; undefined cells stay `None`
pub fn expand_features(frame: &FeatureFrame, config: &FeatureConfig) -> Result<FeatureFrame> {
    config.validate()?;

    let mut expanded = frame.clone();
    temporal::add_temporal_features(&mut expanded);
    window::add_lag_features(&mut expanded, config);
    window::add_rolling_features(&mut expanded, config);
    indices::add_weather_indices(&mut expanded);
    Ok(expanded)
}

/// Full pipeline: expand, then drop rows with insufficient lookback
pub fn engineer_features(frame: &FeatureFrame, config: &FeatureConfig) -> Result<FeatureFrame> {
    let engineered = expand_features(frame, config)?.drop_incomplete();

    debug!(
        input_rows = frame.len(),
        rows = engineered.len(),
        columns = engineered.n_columns(),
        "Feature engineering complete"
    );
    Ok(engineered)
}

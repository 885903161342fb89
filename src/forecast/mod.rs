//! Recursive multi-day forecasting
//!
//! Each day re-runs the feature pipeline over the accumulated history, with
//! the newest record stamped with the date being forecast, and feeds the
//! rounded predictions back in as the next day's record:
//! - Undefined or absent feature columns are zero-filled
//! - Early days therefore run on zero-padded lags and windows
//! - The history is a value threaded through a fold, so calls never share state

mod service;
#[cfg(test)]
mod tests;

pub use service::{ForecastService, ForecastSource, ServedForecast};

use crate::error::{ForecastError, Result};
use crate::features::{expand_features, FeatureFrame};
use crate::ml::Regressor;
use crate::registry::ForecastArtifact;
use crate::types::{ForecastDay, Target, WeatherRecord};
use chrono::NaiveDate;
use ndarray::Array2;
use rust_decimal::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Longest supported horizon in days
pub const MAX_HORIZON: usize = 14;

fn check_horizon(horizon: usize) -> Result<()> {
    if (1..=MAX_HORIZON).contains(&horizon) {
        Ok(())
    } else {
        Err(ForecastError::InvalidHorizon(horizon))
    }
}

/// Round half-to-even at two decimal places of the exact binary value
pub fn round_prediction(value: f64) -> Result<f64> {
    Decimal::from_f64_retain(value)
        .and_then(|d| d.round_dp(2).to_f64())
        .ok_or_else(|| ForecastError::InvalidParameter(format!("prediction {} is not representable", value)))
}

/// Forecast `horizon` days after a single seed record
pub fn forecast(artifact: &ForecastArtifact, seed: &WeatherRecord, horizon: usize) -> Result<Vec<ForecastDay>> {
    forecast_from_history(artifact, std::slice::from_ref(seed), horizon)
}

/// Forecast `horizon` days after the last record of `history`
pub fn forecast_from_history(
    artifact: &ForecastArtifact,
    history: &[WeatherRecord],
    horizon: usize,
) -> Result<Vec<ForecastDay>> {
    check_horizon(horizon)?;
    artifact.ensure_complete()?;
    if history.is_empty() {
        return Err(ForecastError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let lookback = artifact.feature_config.lookback();
    let start = ForecastState {
        history: history.to_vec(),
        days: Vec::with_capacity(horizon),
    };
    let done = (0..horizon).try_fold(start, |state, _| state.advance(artifact, lookback))?;
    Ok(done.days)
}

/// Accumulator of the recursive fold
struct ForecastState {
    history: Vec<WeatherRecord>,
    days: Vec<ForecastDay>,
}

impl ForecastState {
    fn advance(mut self, artifact: &ForecastArtifact, lookback: usize) -> Result<Self> {
        let last = self.history.last().ok_or(ForecastError::InsufficientData {
            required: 1,
            actual: 0,
        })?;
        let date = last
            .date
            .succ_opt()
            .ok_or_else(|| ForecastError::InvalidParameter(format!("no day after {}", last.date)))?;

        let row = feature_row(artifact, &self.history, date, lookback)?;

        let mut next = last.clone();
        next.date = date;
        let mut predictions = BTreeMap::new();
        for target in Target::ALL {
            let raw = artifact.model(target)?.predict(&row)?;
            let value = round_prediction(raw.first().copied().unwrap_or_default())?;
            target.assign(&mut next, value);
            predictions.insert(target, value);
        }

        debug!(%date, step = self.days.len() + 1, "Forecast day generated");
        self.history.push(next);
        self.days.push(ForecastDay { date, predictions });
        Ok(self)
    }
}

/// Engineered features of the newest record re-dated to `date`, aligned to
/// the artifact's column order
fn feature_row(
    artifact: &ForecastArtifact,
    history: &[WeatherRecord],
    date: NaiveDate,
    lookback: usize,
) -> Result<Array2<f64>> {
    // Only the trailing lookback window influences the newest row
    let mut window = history[history.len().saturating_sub(lookback + 1)..].to_vec();
    if let Some(newest) = window.last_mut() {
        newest.date = date;
    }

    let expanded = expand_features(&FeatureFrame::from_records(&window)?, &artifact.feature_config)?;
    let newest = expanded.len() - 1;
    let columns = &artifact.feature_columns;

    Ok(Array2::from_shape_fn((1, columns.len()), |(_, j)| {
        expanded.value(newest, &columns[j]).unwrap_or(0.0)
    }))
}

/// Carry the seed's target values forward unchanged
pub fn persistence_forecast(seed: &WeatherRecord, horizon: usize) -> Result<Vec<ForecastDay>> {
    check_horizon(horizon)?;

    let mut date = seed.date;
    let mut days = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        date = date
            .succ_opt()
            .ok_or_else(|| ForecastError::InvalidParameter(format!("no day after {}", date)))?;
        let predictions = Target::ALL
            .iter()
            .map(|t| Ok((*t, round_prediction(t.value(seed))?)))
            .collect::<Result<BTreeMap<Target, f64>>>()?;
        days.push(ForecastDay { date, predictions });
    }
    Ok(days)
}

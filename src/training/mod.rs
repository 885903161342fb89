//! Ensemble trainer
//!
//! One training run:
//! - Validates the raw frame (lookback length, target columns)
//! - Engineers features once
//! - Splits chronologically, test rows strictly after train rows
//! - Fits one weighted ensemble per target and scores it on the holdout
//!
//! The result is an immutable [`TrainingRun`] plus the [`ForecastArtifact`]
//! that the registry persists.


use crate::config::Config;
use crate::error::{ForecastError, Result};
use crate::features::{engineer_features, FeatureConfig, FeatureFrame};
use crate::ml::{build_ensemble, EnsembleParams, Learner, RegressionMetrics, Regressor, WeightedEnsemble};
use crate::registry::ForecastArtifact;
use crate::types::Target;
use chrono::{DateTime, NaiveDate, Utc};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{info, info_span};
use uuid::Uuid;

/// Training run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Share of the engineered rows held out for evaluation
    pub test_fraction: f64,
    /// Minimum engineered rows required to train
    pub min_rows: usize,
    /// Days of synthetic history used when no dataset is supplied
    pub synthetic_days: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            min_rows: 20,
            synthetic_days: 3650,
        }
    }
}

/// Row ranges of a chronological train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChronologicalSplit {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Hold out the last `ceil(n_rows * test_fraction)` rows; no shuffling
pub fn chronological_split(n_rows: usize, test_fraction: f64) -> Result<ChronologicalSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    if n_rows < 2 {
        return Err(ForecastError::InsufficientData {
            required: 2,
            actual: n_rows,
        });
    }

    let n_test = ((n_rows as f64 * test_fraction).ceil() as usize).clamp(1, n_rows - 1);
    let n_train = n_rows - n_test;
    Ok(ChronologicalSplit {
        train: 0..n_train,
        test: n_train..n_rows,
    })
}

/// Numeric inputs for one target
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    /// Feature column order of the matrix
    pub columns: Vec<String>,
    pub features: Array2<f64>,
    pub targets: Vec<f64>,
    pub dates: Vec<NaiveDate>,
}

/// Matrix of every non-target column plus the target vector
pub fn prepare_features(frame: &FeatureFrame, target: Target) -> Result<PreparedFeatures> {
    let target_values = frame
        .column(target.column())
        .ok_or_else(|| ForecastError::MissingColumn(target.column().to_string()))?;

    let feature_columns: Vec<(&str, &[Option<f64>])> = frame
        .columns()
        .filter(|(name, _)| !Target::is_target_column(name))
        .collect();

    let mut features = Array2::zeros((frame.len(), feature_columns.len()));
    for (j, (name, values)) in feature_columns.iter().enumerate() {
        for (i, value) in values.iter().enumerate() {
            features[[i, j]] = value.filter(|v| v.is_finite()).ok_or_else(|| ForecastError::UndefinedValue {
                column: name.to_string(),
                row: i,
            })?;
        }
    }

    let targets = target_values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            value.filter(|v| v.is_finite()).ok_or_else(|| ForecastError::UndefinedValue {
                column: target.column().to_string(),
                row: i,
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(PreparedFeatures {
        columns: feature_columns.iter().map(|(name, _)| name.to_string()).collect(),
        features,
        targets,
        dates: frame.dates().to_vec(),
    })
}

/// Dates and row counts a run was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Rows before feature engineering
    pub raw_rows: usize,
    /// Rows surviving feature engineering
    pub engineered_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Immutable summary of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRun {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub window: DatasetWindow,
    /// Holdout metrics per target
    pub metrics: BTreeMap<Target, RegressionMetrics>,
    pub avg_r2: f64,
    pub avg_rmse: f64,
    pub feature_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub run: TrainingRun,
    pub artifact: ForecastArtifact,
}

/// Fits the per-target ensembles
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    features: FeatureConfig,
    ensemble: EnsembleParams,
    training: TrainingConfig,
}

impl Trainer {
    pub fn new(features: FeatureConfig, ensemble: EnsembleParams, training: TrainingConfig) -> Self {
        Self {
            features,
            ensemble,
            training,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.features.clone(),
            config.ensemble.clone(),
            config.training.clone(),
        )
    }

    pub fn feature_config(&self) -> &FeatureConfig {
        &self.features
    }

    pub fn train(&self, frame: &FeatureFrame) -> Result<TrainingOutcome> {
        let required = self.features.min_history();
        if frame.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: frame.len(),
            });
        }
        if let Some(missing) = Target::ALL.iter().find(|t| !frame.has_column(t.column())) {
            return Err(ForecastError::MissingColumn(missing.column().to_string()));
        }

        let engineered = engineer_features(frame, &self.features)?;
        let min_rows = self.training.min_rows.max(2);
        if engineered.len() < min_rows {
            return Err(ForecastError::InsufficientData {
                required: min_rows,
                actual: engineered.len(),
            });
        }

        let split = chronological_split(engineered.len(), self.training.test_fraction)?;
        info!(
            raw_rows = frame.len(),
            engineered_rows = engineered.len(),
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            columns = engineered.n_columns(),
            "Starting training run"
        );

        let mut models = BTreeMap::new();
        let mut metrics = BTreeMap::new();
        let mut feature_columns = Vec::new();

        for target in Target::ALL {
            let _span = info_span!("train_target", target = %target).entered();
            let prepared = prepare_features(&engineered, target)?;
            let (ensemble, scores) = self.fit_target(&prepared, &split)?;

            info!(
                rmse = scores.rmse,
                mae = scores.mae,
                r2 = scores.r2,
                "Target trained"
            );

            feature_columns = prepared.columns;
            models.insert(target, ensemble);
            metrics.insert(target, scores);
        }

        let n_targets = metrics.len() as f64;
        let avg_r2 = metrics.values().map(|m| m.r2).sum::<f64>() / n_targets;
        let avg_rmse = metrics.values().map(|m| m.rmse).sum::<f64>() / n_targets;

        let dates = frame.dates();
        let run = TrainingRun {
            run_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            window: DatasetWindow {
                start: dates[0],
                end: dates[dates.len() - 1],
                raw_rows: frame.len(),
                engineered_rows: engineered.len(),
                train_rows: split.train.len(),
                test_rows: split.test.len(),
            },
            metrics,
            avg_r2,
            avg_rmse,
            feature_columns,
        };

        info!(
            run_id = %run.run_id,
            avg_r2 = run.avg_r2,
            avg_rmse = run.avg_rmse,
            "Training run complete"
        );

        let artifact = ForecastArtifact::from_run(&run, self.features.clone(), models);
        Ok(TrainingOutcome { run, artifact })
    }

    fn fit_target(
        &self,
        prepared: &PreparedFeatures,
        split: &ChronologicalSplit,
    ) -> Result<(WeightedEnsemble<Learner>, RegressionMetrics)> {
        let train_x = prepared.features.slice(s![split.train.clone(), ..]).to_owned();
        let test_x = prepared.features.slice(s![split.test.clone(), ..]).to_owned();
        let train_y = &prepared.targets[split.train.clone()];
        let test_y = &prepared.targets[split.test.clone()];

        let mut ensemble = build_ensemble(&self.ensemble)?;
        ensemble.fit(&train_x, train_y)?;
        let predictions = ensemble.predict(&test_x)?;
        let metrics = RegressionMetrics::compute(test_y, &predictions)?;
        Ok((ensemble, metrics))
    }
}

//! Shared fixtures for unit tests: small ensembles and a cached trained artifact

use crate::config::Config;
use crate::data::synthetic_history;
use crate::features::FeatureFrame;
use crate::ml::{BoostingParams, EnsembleParams, ForestParams};
use crate::registry::RegistryConfig;
use crate::training::{Trainer, TrainingConfig, TrainingOutcome};
use crate::types::WeatherRecord;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::OnceLock;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Ensemble small enough to fit in milliseconds
pub fn tiny_ensemble() -> EnsembleParams {
    let boosting = |mut params: BoostingParams| {
        params.n_estimators = 15;
        params.learning_rate = 0.2;
        params.max_depth = 3;
        params
    };
    EnsembleParams {
        depth_wise: boosting(BoostingParams::depth_wise()),
        leaf_wise: BoostingParams {
            num_leaves: Some(7),
            min_child_samples: 5,
            ..boosting(BoostingParams::leaf_wise())
        },
        forest: ForestParams {
            n_estimators: 8,
            max_depth: 5,
            ..Default::default()
        },
    }
}

pub fn tiny_config(registry_root: &Path) -> Config {
    Config {
        ensemble: tiny_ensemble(),
        training: TrainingConfig {
            synthetic_days: 150,
            ..Default::default()
        },
        registry: RegistryConfig {
            root: registry_root.display().to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn tiny_trainer() -> Trainer {
    Trainer::new(Default::default(), tiny_ensemble(), TrainingConfig::default())
}

/// 120 synthetic days ending 2023-12-31
pub fn history() -> Vec<WeatherRecord> {
    synthetic_history(120, date(2023, 12, 31), 42).unwrap()
}

/// Trained once per test binary
pub fn trained() -> &'static TrainingOutcome {
    static OUTCOME: OnceLock<TrainingOutcome> = OnceLock::new();
    OUTCOME.get_or_init(|| {
        let frame = FeatureFrame::from_records(&history()).unwrap();
        tiny_trainer().train(&frame).unwrap()
    })
}

/// The seed record used by the end-to-end forecast scenario
pub fn new_year_seed() -> WeatherRecord {
    WeatherRecord {
        date: date(2024, 1, 1),
        latitude: 40.7128,
        longitude: -74.006,
        temp_max: 10.0,
        temp_min: 2.0,
        humidity: 70.0,
        pressure: 1015.0,
        wind_speed: 12.0,
        cloud_cover: 40.0,
        precipitation: 1.0,
    }
}

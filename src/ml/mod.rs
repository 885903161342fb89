//! Regression learners for the forecasting ensemble
//!
//! Provides:
//! - Histogram regression trees with Newton and variance split criteria
//! - Depth-wise and leaf-wise gradient boosting
//! - A bagged random forest built in parallel
//! - The `Regressor` capability trait and a weighted averaging ensemble
//! - Holdout regression metrics (RMSE, MAE, R²)

pub mod boosting;
pub mod ensemble;
pub mod forest;
pub mod metrics;
pub mod tree;


pub use boosting::{BoostingParams, GradientBoostedTrees};
pub use ensemble::{
    build_ensemble, EnsembleMember, EnsembleParams, Learner, Regressor, WeightedEnsemble,
    ENSEMBLE_WEIGHTS,
};
pub use forest::{ForestParams, RandomForest};
pub use metrics::RegressionMetrics;

use crate::error::{ForecastError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::index::sample;

pub(crate) fn check_training_input(features: &Array2<f64>, targets: &[f64]) -> Result<()> {
    let (n_rows, n_features) = features.dim();
    if n_rows != targets.len() {
        return Err(ForecastError::ShapeMismatch {
            expected: n_rows,
            actual: targets.len(),
        });
    }
    if n_rows < 2 {
        return Err(ForecastError::InsufficientData {
            required: 2,
            actual: n_rows,
        });
    }
    if n_features == 0 {
        return Err(ForecastError::InvalidParameter(
            "feature matrix has no columns".to_string(),
        ));
    }
    if !features.iter().chain(targets).all(|v| v.is_finite()) {
        return Err(ForecastError::InvalidParameter(
            "training data contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_prediction_input(features: &Array2<f64>, n_features: usize) -> Result<()> {
    if features.ncols() != n_features {
        return Err(ForecastError::ShapeMismatch {
            expected: n_features,
            actual: features.ncols(),
        });
    }
    Ok(())
}

/// `amount` distinct indices below `length`, ascending
pub(crate) fn sampled_indices(rng: &mut StdRng, length: usize, amount: usize) -> Vec<usize> {
    let mut picked = sample(rng, length, amount.min(length)).into_vec();
    picked.sort_unstable();
    picked
}

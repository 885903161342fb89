//! Gradient-boosted regression trees
//!
//! One implementation covers both boosted families of the ensemble:
//! - depth-wise growth with Newton gain (XGBoost-like)
//! - leaf-wise growth capped by a leaf count (LightGBM-like)

use super::ensemble::Regressor;
use super::tree::{BinnedFeatures, RegressionTree, SplitCriterion, TreeBuilder, TreeParams, DEFAULT_MAX_BINS};
use super::{check_prediction_input, check_training_input, sampled_indices};
use crate::error::{ForecastError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Leaf-wise growth cap; depth-wise growth when absent
    pub num_leaves: Option<usize>,
    /// Fraction of rows drawn (without replacement) per tree
    pub subsample: f64,
    /// Fraction of features drawn per tree
    pub colsample_bytree: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    pub min_child_samples: usize,
    /// Minimum loss reduction to split
    pub gamma: f64,
    /// L1 regularisation on leaf weights
    pub reg_alpha: f64,
    /// L2 regularisation on leaf weights
    pub reg_lambda: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl BoostingParams {
    /// Depth-wise family
    pub fn depth_wise() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.05,
            max_depth: 6,
            num_leaves: None,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_child_weight: 3.0,
            min_child_samples: 1,
            gamma: 0.1,
            reg_alpha: 0.1,
            reg_lambda: 1.0,
            max_bins: DEFAULT_MAX_BINS,
            seed: 42,
        }
    }

    /// Leaf-wise family
    pub fn leaf_wise() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.05,
            max_depth: 6,
            num_leaves: Some(31),
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_child_weight: 1e-3,
            min_child_samples: 20,
            gamma: 0.0,
            reg_alpha: 0.1,
            reg_lambda: 1.0,
            max_bins: DEFAULT_MAX_BINS,
            seed: 42,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, value) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.num_leaves.is_some_and(|n| n < 2) {
            return Err(ForecastError::InvalidParameter(
                "num_leaves must be at least 2".to_string(),
            ));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.gamma < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "regularisation terms must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            max_leaves: self.num_leaves,
            min_child_samples: self.min_child_samples,
            min_child_weight: self.min_child_weight,
            min_samples_split: 2,
            features_per_split: None,
            criterion: SplitCriterion::Newton {
                lambda: self.reg_lambda,
                alpha: self.reg_alpha,
                gamma: self.gamma,
            },
        }
    }
}

/// Additive tree model fitted on squared-error gradients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostingParams,
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

impl Regressor for GradientBoostedTrees {
    fn fit(&mut self, features: &Array2<f64>, targets: &[f64]) -> Result<()> {
        check_training_input(features, targets)?;
        self.params.validate()?;

        let (n_rows, n_features) = features.dim();
        let binned = BinnedFeatures::build(features, self.params.max_bins);
        let tree_params = self.params.tree_params();

        let n_sampled_rows = ((n_rows as f64 * self.params.subsample).round() as usize).clamp(1, n_rows);
        let n_sampled_cols =
            ((n_features as f64 * self.params.colsample_bytree).round() as usize).clamp(1, n_features);

        let base_score = targets.iter().sum::<f64>() / n_rows as f64;
        let mut predictions = vec![base_score; n_rows];
        let hess = vec![1.0; n_rows];
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            let grad: Vec<f64> = predictions
                .iter()
                .zip(targets)
                .map(|(pred, actual)| pred - actual)
                .collect();
            let rows = sampled_indices(&mut rng, n_rows, n_sampled_rows);
            let columns = sampled_indices(&mut rng, n_features, n_sampled_cols);

            let mut tree = TreeBuilder::new(&binned, &tree_params, &columns, &grad, &hess).build(rows, &mut rng);
            tree.scale(self.params.learning_rate);

            predictions
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, pred)| *pred += tree.predict_row(features.row(i)));
            trees.push(tree);
        }

        debug!(
            rows = n_rows,
            features = n_features,
            trees = trees.len(),
            leaf_wise = self.params.num_leaves.is_some(),
            "Boosted trees fitted"
        );

        self.base_score = base_score;
        self.n_features = n_features;
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(ForecastError::ModelNotTrained(
                "gradient boosted trees have not been fitted".to_string(),
            ));
        }
        check_prediction_input(features, self.n_features)?;

        Ok(features
            .outer_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }
}

//! Bagged random forest of variance-reduction trees

use super::ensemble::Regressor;
use super::tree::{BinnedFeatures, RegressionTree, SplitCriterion, TreeBuilder, TreeParams, DEFAULT_MAX_BINS};
use super::{check_prediction_input, check_training_input};
use crate::error::{ForecastError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `floor(sqrt(p))` when absent
    pub max_features: Option<usize>,
    /// Draw rows with replacement for each tree
    pub bootstrap: bool,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            max_bins: DEFAULT_MAX_BINS,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features)
    }
}

/// Mean of independently grown trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, features: &Array2<f64>, targets: &[f64]) -> Result<()> {
        check_training_input(features, targets)?;
        self.params.validate()?;

        let (n_rows, n_features) = features.dim();
        let binned = BinnedFeatures::build(features, self.params.max_bins);
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            max_leaves: None,
            min_child_samples: self.params.min_samples_leaf,
            min_child_weight: 0.0,
            min_samples_split: self.params.min_samples_split,
            features_per_split: Some(self.params.features_per_split(n_features)),
            criterion: SplitCriterion::Variance,
        };
        let all_features: Vec<usize> = (0..n_features).collect();
        let hess = vec![1.0; n_rows];
        let params = &self.params;

        // Per-tree RNG seeded from the tree index
        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let rows: Vec<usize> = if params.bootstrap {
                    (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                TreeBuilder::new(&binned, &tree_params, &all_features, targets, &hess).build(rows, &mut rng)
            })
            .collect();

        debug!(
            rows = n_rows,
            features = n_features,
            trees = trees.len(),
            "Random forest fitted"
        );

        self.n_features = n_features;
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(ForecastError::ModelNotTrained(
                "random forest has not been fitted".to_string(),
            ));
        }
        check_prediction_input(features, self.n_features)?;

        let n_trees = self.trees.len() as f64;
        Ok(features
            .outer_iter()
            .map(|row| self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }
}

//! Weighted averaging ensemble over interchangeable regressors

use super::boosting::{BoostingParams, GradientBoostedTrees};
use super::forest::{ForestParams, RandomForest};
use crate::error::{ForecastError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Capability shared by every ensemble member
#[cfg_attr(test, mockall::automock)]
pub trait Regressor: Send + Sync {
    /// Fit on a row-major feature matrix and one target per row
    fn fit(&mut self, features: &Array2<f64>, targets: &[f64]) -> Result<()>;

    /// One prediction per row
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>>;
}

impl<R: Regressor + ?Sized> Regressor for Box<R> {
    fn fit(&mut self, features: &Array2<f64>, targets: &[f64]) -> Result<()> {
        (**self).fit(features, targets)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        (**self).predict(features)
    }
}

/// A weighted ensemble member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember<R> {
    pub name: String,
    pub weight: f64,
    pub model: R,
}

impl<R> EnsembleMember<R> {
    pub fn new(name: impl Into<String>, weight: f64, model: R) -> Self {
        Self {
            name: name.into(),
            weight,
            model,
        }
    }
}

/// Prediction is the weighted average of member outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEnsemble<R> {
    members: Vec<EnsembleMember<R>>,
}

impl<R: Regressor> WeightedEnsemble<R> {
    pub fn new(members: Vec<EnsembleMember<R>>) -> Result<Self> {
        if members.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "ensemble needs at least one member".to_string(),
            ));
        }
        if let Some(member) = members.iter().find(|m| !(m.weight.is_finite() && m.weight >= 0.0)) {
            return Err(ForecastError::InvalidParameter(format!(
                "member '{}' has invalid weight {}",
                member.name, member.weight
            )));
        }
        if members.iter().map(|m| m.weight).sum::<f64>() <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "ensemble weights sum to zero".to_string(),
            ));
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[EnsembleMember<R>] {
        &self.members
    }

    pub fn weights(&self) -> Vec<f64> {
        self.members.iter().map(|m| m.weight).collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.members.iter().map(|m| m.weight).sum()
    }
}

impl<R: Regressor> Regressor for WeightedEnsemble<R> {
    fn fit(&mut self, features: &Array2<f64>, targets: &[f64]) -> Result<()> {
        for member in &mut self.members {
            member.model.fit(features, targets)?;
            debug!(member = %member.name, weight = member.weight, "Ensemble member fitted");
        }
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let n_rows = features.nrows();
        let mut combined = vec![0.0; n_rows];

        for member in &self.members {
            let predictions = member.model.predict(features)?;
            if predictions.len() != n_rows {
                return Err(ForecastError::ShapeMismatch {
                    expected: n_rows,
                    actual: predictions.len(),
                });
            }
            for (acc, p) in combined.iter_mut().zip(predictions) {
                *acc += member.weight * p;
            }
        }

        let total = self.total_weight();
        Ok(combined.into_iter().map(|v| v / total).collect())
    }
}

/// Concrete learners the trained ensemble is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Learner {
    Boosted(GradientBoostedTrees),
    Forest(RandomForest),
}

impl Regressor for Learner {
    fn fit(&mut self, features: &Array2<f64>, targets: &[f64]) -> Result<()> {
        match self {
            Learner::Boosted(model) => model.fit(features, targets),
            Learner::Forest(model) => model.fit(features, targets),
        }
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        match self {
            Learner::Boosted(model) => model.predict(features),
            Learner::Forest(model) => model.predict(features),
        }
    }
}

/// Hyperparameters of the three ensemble members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleParams {
    pub depth_wise: BoostingParams,
    pub leaf_wise: BoostingParams,
    pub forest: ForestParams,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            depth_wise: BoostingParams::depth_wise(),
            leaf_wise: BoostingParams::leaf_wise(),
            forest: ForestParams::default(),
        }
    }
}

/// Fixed member weights: depth-wise boosting, leaf-wise boosting, forest
pub const ENSEMBLE_WEIGHTS: [f64; 3] = [0.4, 0.4, 0.2];

/// Three unfitted, independently configured members at their fixed weights
pub fn build_ensemble(params: &EnsembleParams) -> Result<WeightedEnsemble<Learner>> {
    params.depth_wise.validate()?;
    params.leaf_wise.validate()?;
    params.forest.validate()?;

    WeightedEnsemble::new(vec![
        EnsembleMember::new(
            "depth_wise_boosting",
            ENSEMBLE_WEIGHTS[0],
            Learner::Boosted(GradientBoostedTrees::new(params.depth_wise.clone())),
        ),
        EnsembleMember::new(
            "leaf_wise_boosting",
            ENSEMBLE_WEIGHTS[1],
            Learner::Boosted(GradientBoostedTrees::new(params.leaf_wise.clone())),
        ),
        EnsembleMember::new(
            "random_forest",
            ENSEMBLE_WEIGHTS[2],
            Learner::Forest(RandomForest::new(params.forest.clone())),
        ),
    ])
}

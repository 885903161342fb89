//! Holdout regression metrics

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(ForecastError::ShapeMismatch {
                expected: actual.len(),
                actual: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;

        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        let mut abs_err = 0.0;
        for (y, p) in actual.iter().zip(predicted) {
            ss_res += (y - p).powi(2);
            ss_tot += (y - mean).powi(2);
            abs_err += (y - p).abs();
        }

        // Constant actuals: perfect predictions score 1, anything else 0
        let r2 = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        Ok(Self {
            rmse: (ss_res / n).sqrt(),
            mae: abs_err / n,
            r2,
        })
    }
}

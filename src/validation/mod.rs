//! CI validation gate
//!
//! Compares a run's averaged holdout metrics against thresholds and writes a
//! JSON report. Outcomes map to process exit codes:
//! - Passed: 0
//! - Skipped (input or registered run unavailable): 0, with a warning
//! - BelowThreshold: 1
//! - Errored: 2

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::data::{load_frame, synthetic_history};
use crate::error::Result;
use crate::features::FeatureFrame;
use crate::registry::{read_json, write_json_atomic, ModelRegistry, Stage};
use crate::training::Trainer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Seed of the synthetic history used when no dataset is given
pub const SYNTHETIC_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub min_r2: f64,
    pub max_rmse: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_r2: 0.85,
            max_rmse: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub r2: f64,
    pub rmse: f64,
}

/// Persisted gate result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: DateTime<Utc>,
    pub passed: bool,
    pub metrics: ReportMetrics,
    pub thresholds: ValidationThresholds,
    pub artifact_path: String,
    /// Human-readable threshold violations
    pub failures: Vec<String>,
}

impl ValidationReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self, true)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn summary(&self) -> String {
        let rule = "=".repeat(50);
        format!(
            "\n{rule}\n  MODEL VALIDATION REPORT\n{rule}\n  Timestamp : {}\n  Result    : {}\n\n  Metrics:\n    R²   = {:.4}  (min: {})\n    RMSE = {:.4}  (max: {})\n{rule}\n",
            self.timestamp.to_rfc3339(),
            if self.passed { "PASSED" } else { "FAILED" },
            self.metrics.r2,
            self.thresholds.min_r2,
            self.metrics.rmse,
            self.thresholds.max_rmse,
        )
    }
}

/// Passed iff `avg_r2 >= min_r2` and `avg_rmse <= max_rmse`
pub fn evaluate(
    avg_r2: f64,
    avg_rmse: f64,
    thresholds: &ValidationThresholds,
    artifact_path: &str,
) -> ValidationReport {
    let mut failures = Vec::new();
    if !(avg_r2 >= thresholds.min_r2) {
        failures.push(format!(
            "R² {:.4} is below threshold {}",
            avg_r2, thresholds.min_r2
        ));
    }
    if !(avg_rmse <= thresholds.max_rmse) {
        failures.push(format!(
            "RMSE {:.4} exceeds threshold {}",
            avg_rmse, thresholds.max_rmse
        ));
    }

    ValidationReport {
        timestamp: Utc::now(),
        passed: failures.is_empty(),
        metrics: ReportMetrics {
            r2: avg_r2,
            rmse: avg_rmse,
        },
        thresholds: *thresholds,
        artifact_path: artifact_path.to_string(),
        failures,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Passed(ValidationReport),
    BelowThreshold(ValidationReport),
    Skipped { reason: String },
    Errored { message: String },
}

impl ValidationOutcome {
    pub fn from_result(result: Result<ValidationReport>) -> Self {
        match result {
            Ok(report) if report.passed => ValidationOutcome::Passed(report),
            Ok(report) => ValidationOutcome::BelowThreshold(report),
            Err(e) if e.is_unavailable() => ValidationOutcome::Skipped {
                reason: e.to_string(),
            },
            Err(e) => ValidationOutcome::Errored {
                message: e.to_string(),
            },
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ValidationOutcome::Passed(_) | ValidationOutcome::Skipped { .. } => 0,
            ValidationOutcome::BelowThreshold(_) => 1,
            ValidationOutcome::Errored { .. } => 2,
        }
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ValidationOutcome::Passed(report) | ValidationOutcome::BelowThreshold(report) => Some(report),
            _ => None,
        }
    }
}

/// Where the metrics under test come from
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationSource {
    /// Train a fresh run on a CSV, or on synthetic history when absent
    Train { data: Option<PathBuf> },
    /// Use the metrics of the newest run registered at a stage
    Registered { stage: Stage },
}

#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub thresholds: ValidationThresholds,
    pub source: ValidationSource,
    /// Directory a freshly trained artifact is written to
    pub model_path: String,
    pub report_path: PathBuf,
}

struct Measurement {
    avg_r2: f64,
    avg_rmse: f64,
    artifact: PathBuf,
}

fn measure(config: &Config, request: &ValidationRequest) -> Result<Measurement> {
    match &request.source {
        ValidationSource::Train { data } => {
            let frame = match data {
                Some(path) => load_frame(path)?,
                None => {
                    let today = Utc::now().date_naive();
                    let records = synthetic_history(config.training.synthetic_days, today, SYNTHETIC_SEED)?;
                    FeatureFrame::from_records(&records)?
                }
            };
            let outcome = Trainer::from_config(config).train(&frame)?;
            let path = Path::new(&request.model_path).join(format!("{}.json", outcome.artifact.run_id));
            outcome.artifact.save(&path)?;
            info!(path = %path.display(), "Trained artifact saved");
            Ok(Measurement {
                avg_r2: outcome.run.avg_r2,
                avg_rmse: outcome.run.avg_rmse,
                artifact: path,
            })
        }
        ValidationSource::Registered { stage } => {
            let registry = ModelRegistry::open(&config.registry)?;
            let loaded = registry.load_latest(*stage)?;
            Ok(Measurement {
                avg_r2: loaded.artifact.avg_r2,
                avg_rmse: loaded.artifact.avg_rmse,
                artifact: registry.artifact_path(&loaded.entry),
            })
        }
    }
}

/// Measure, evaluate and write the report, classifying the result
pub fn run(config: &Config, request: &ValidationRequest) -> ValidationOutcome {
    info!(
        min_r2 = request.thresholds.min_r2,
        max_rmse = request.thresholds.max_rmse,
        "Starting model validation"
    );

    let result = measure(config, request).and_then(|m| {
        let artifact_path = m.artifact.display().to_string();
        let report = evaluate(m.avg_r2, m.avg_rmse, &request.thresholds, &artifact_path);
        report.write(&request.report_path)?;
        info!(path = %request.report_path.display(), "Validation report saved");
        Ok(report)
    });

    let outcome = ValidationOutcome::from_result(result);
    match &outcome {
        ValidationOutcome::Passed(report) => {
            info!(r2 = report.metrics.r2, rmse = report.metrics.rmse, "Model validation passed");
        }
        ValidationOutcome::BelowThreshold(report) => {
            for failure in &report.failures {
                error!("{}", failure);
            }
            error!("Model validation failed");
        }
        ValidationOutcome::Skipped { reason } => {
            warn!(%reason, "Validation skipped");
        }
        ValidationOutcome::Errored { message } => {
            error!(%message, "Validation error");
        }
    }
    outcome
}


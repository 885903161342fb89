//! Trained forecast artifact and atomic JSON persistence

use crate::error::{ForecastError, Result};
use crate::features::FeatureConfig;
use crate::ml::{Learner, RegressionMetrics, WeightedEnsemble};
use crate::training::TrainingRun;
use crate::types::Target;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Everything needed to forecast with one training run's ensembles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArtifact {
    pub format_version: u32,
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    /// Frozen column order the ensembles were fitted on
    pub feature_columns: Vec<String>,
    /// Feature parameters used in training, replayed at forecast time
    pub feature_config: FeatureConfig,
    pub metrics: BTreeMap<Target, RegressionMetrics>,
    pub avg_r2: f64,
    pub avg_rmse: f64,
    pub models: BTreeMap<Target, WeightedEnsemble<Learner>>,
}

impl ForecastArtifact {
    pub fn from_run(
        run: &TrainingRun,
        feature_config: FeatureConfig,
        models: BTreeMap<Target, WeightedEnsemble<Learner>>,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            run_id: run.run_id,
            trained_at: run.trained_at,
            feature_columns: run.feature_columns.clone(),
            feature_config,
            metrics: run.metrics.clone(),
            avg_r2: run.avg_r2,
            avg_rmse: run.avg_rmse,
            models,
        }
    }

    /// Ensemble for one target
    pub fn model(&self, target: Target) -> Result<&WeightedEnsemble<Learner>> {
        self.models
            .get(&target)
            .ok_or_else(|| ForecastError::ModelNotTrained(format!("no ensemble for target {}", target)))
    }

    /// Fails unless every target has an ensemble
    pub fn ensure_complete(&self) -> Result<()> {
        for target in Target::ALL {
            self.model(target)?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self, false)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let artifact: Self = read_json(path)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ForecastError::InvalidParameter(format!(
                "unsupported artifact format version {} in {}",
                artifact.format_version,
                path.display()
            )));
        }
        Ok(artifact)
    }
}

/// Write JSON to a temp file in the target directory, fsync, then rename over
/// the target. The temp file is removed if any step fails.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        if pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ForecastError::Io(e.error))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

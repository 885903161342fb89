//! File-backed model registry
//!
//! Layout under the configured root:
//! - `<model>/registry.json`: version index with stage pointers
//! - `<model>/artifacts/`: one JSON artifact per persisted version
//!
//! Every file write is atomic (temp file, fsync, rename). Writers re-read the
//! index while holding an exclusive lock on `<model>/registry.lock`, so
//! handles in other processes never overwrite each other's versions or stage
//! changes. Reads go to disk and see either the old or the new index.

mod artifact;

pub use artifact::{read_json, write_json_atomic, ForecastArtifact, ARTIFACT_FORMAT_VERSION};

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "registry.json";
const ARTIFACT_DIR: &str = "artifacts";
const LOCK_FILE: &str = "registry.lock";

/// Lifecycle stage of a registered model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Staging,
    Production,
    Archived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Staging => write!(f, "Staging"),
            Stage::Production => write!(f, "Production"),
            Stage::Archived => write!(f, "Archived"),
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

/// Registry location and stage policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root directory; `~` is expanded
    pub root: String,
    pub model_name: String,
    /// Stage loaded by the forecast service
    pub serving_stage: Stage,
    /// Stage assigned to newly persisted versions
    pub initial_stage: Stage,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: "~/.weather-forecast/registry".to_string(),
            model_name: "weather-forecast".to_string(),
            serving_stage: Stage::Production,
            initial_stage: Stage::Staging,
        }
    }
}

impl RegistryConfig {
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).into_owned())
    }
}

/// One registered model version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistryEntry {
    pub version: u32,
    pub run_id: Uuid,
    pub stage: Stage,
    /// Artifact location relative to the model directory
    pub artifact_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub promoted_at: Option<DateTime<Utc>>,
    pub avg_r2: f64,
    pub avg_rmse: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryIndex {
    model_name: String,
    entries: Vec<ModelRegistryEntry>,
}

/// Artifact loaded from a stage together with its registry entry
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub entry: ModelRegistryEntry,
    pub artifact: ForecastArtifact,
}

/// Exclusive advisory lock on the index, released when the file closes
struct IndexLock {
    _file: File,
}

impl IndexLock {
    fn acquire(dir: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        FileExt::lock_exclusive(&file)?;
        Ok(Self { _file: file })
    }
}

fn read_index(dir: &Path, model_name: &str) -> Result<Vec<ModelRegistryEntry>> {
    let index_path = dir.join(INDEX_FILE);
    if !index_path.exists() {
        return Ok(Vec::new());
    }

    let index: RegistryIndex = read_json(&index_path)?;
    if index.model_name != model_name {
        warn!(
            expected = %model_name,
            found = %index.model_name,
            "Registry index belongs to a different model name"
        );
    }
    Ok(index.entries)
}

pub struct ModelRegistry {
    dir: PathBuf,
    model_name: String,
    initial_stage: Stage,
    /// Last index read from disk; the write guard serialises writers in this process
    entries: RwLock<Vec<ModelRegistryEntry>>,
}

impl ModelRegistry {
    /// Open (or create) the registry for `config.model_name`
    pub fn open(config: &RegistryConfig) -> Result<Self> {
        if config.initial_stage == Stage::Archived {
            return Err(ForecastError::InvalidParameter(
                "initial stage cannot be Archived".to_string(),
            ));
        }
        if config.model_name.is_empty() || config.model_name.contains(['/', '\\']) {
            return Err(ForecastError::InvalidParameter(format!(
                "invalid model name '{}'",
                config.model_name
            )));
        }

        let dir = config.root_path().join(&config.model_name);
        std::fs::create_dir_all(dir.join(ARTIFACT_DIR))?;

        let entries = read_index(&dir, &config.model_name)?;

        debug!(dir = %dir.display(), versions = entries.len(), "Registry opened");

        Ok(Self {
            dir,
            model_name: config.model_name.clone(),
            initial_stage: config.initial_stage,
            entries: RwLock::new(entries),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Absolute path of an entry's artifact
    pub fn artifact_path(&self, entry: &ModelRegistryEntry) -> PathBuf {
        self.dir.join(&entry.artifact_path)
    }

    /// Store an artifact as the next version at the initial stage
    pub fn persist(&self, artifact: &ForecastArtifact) -> Result<ModelRegistryEntry> {
        artifact.ensure_complete()?;

        let _lock = IndexLock::acquire(&self.dir)?;
        let mut entries = self.entries.write();
        *entries = read_index(&self.dir, &self.model_name)?;
        let version = entries.iter().map(|e| e.version).max().unwrap_or(0) + 1;
        let relative = Path::new(ARTIFACT_DIR).join(format!("v{:04}-{}.json", version, artifact.run_id));
        let absolute = self.dir.join(&relative);

        artifact.save(&absolute)?;

        let entry = ModelRegistryEntry {
            version,
            run_id: artifact.run_id,
            stage: self.initial_stage,
            artifact_path: relative,
            created_at: Utc::now(),
            promoted_at: None,
            avg_r2: artifact.avg_r2,
            avg_rmse: artifact.avg_rmse,
        };

        let mut updated = entries.clone();
        updated.push(entry.clone());
        if let Err(e) = self.write_index(&updated) {
            if let Err(cleanup) = std::fs::remove_file(&absolute) {
                warn!(path = %absolute.display(), error = %cleanup, "Failed to remove orphaned artifact");
            }
            return Err(e);
        }
        *entries = updated;

        info!(
            model = %self.model_name,
            version,
            stage = %entry.stage,
            run_id = %entry.run_id,
            "Model version registered"
        );
        Ok(entry)
    }

    /// Move a version to `stage`; the previous Staging/Production occupant is archived
    pub fn promote(&self, version: u32, stage: Stage) -> Result<ModelRegistryEntry> {
        let _lock = IndexLock::acquire(&self.dir)?;
        let mut entries = self.entries.write();
        *entries = read_index(&self.dir, &self.model_name)?;
        if !entries.iter().any(|e| e.version == version) {
            return Err(ForecastError::VersionNotFound(version));
        }

        let now = Utc::now();
        let mut updated = entries.clone();
        for entry in &mut updated {
            if entry.version == version {
                entry.stage = stage;
                entry.promoted_at = Some(now);
            } else if stage != Stage::Archived && entry.stage == stage {
                info!(version = entry.version, from = %stage, "Archiving previous stage occupant");
                entry.stage = Stage::Archived;
            }
        }

        self.write_index(&updated)?;
        *entries = updated;

        let promoted = entries
            .iter()
            .find(|e| e.version == version)
            .cloned()
            .ok_or(ForecastError::VersionNotFound(version))?;
        info!(model = %self.model_name, version, stage = %stage, "Model version promoted");
        Ok(promoted)
    }

    /// Artifact of the highest version at `stage`
    pub fn load_latest(&self, stage: Stage) -> Result<LoadedModel> {
        let entry = self
            .refresh()?
            .into_iter()
            .filter(|e| e.stage == stage)
            .max_by_key(|e| e.version)
            .ok_or(ForecastError::StageNotFound(stage))?;

        let artifact = ForecastArtifact::load(&self.artifact_path(&entry))?;
        artifact.ensure_complete()?;

        debug!(version = entry.version, stage = %stage, "Loaded model artifact");
        Ok(LoadedModel { entry, artifact })
    }

    /// All entries in version order
    pub fn list(&self) -> Result<Vec<ModelRegistryEntry>> {
        let mut entries = self.refresh()?;
        entries.sort_by_key(|e| e.version);
        Ok(entries)
    }

    pub fn entry(&self, version: u32) -> Result<ModelRegistryEntry> {
        self.refresh()?
            .into_iter()
            .find(|e| e.version == version)
            .ok_or(ForecastError::VersionNotFound(version))
    }

    /// Re-read the index so changes made through other handles are visible
    fn refresh(&self) -> Result<Vec<ModelRegistryEntry>> {
        let entries = read_index(&self.dir, &self.model_name)?;
        *self.entries.write() = entries.clone();
        Ok(entries)
    }

    fn write_index(&self, entries: &[ModelRegistryEntry]) -> Result<()> {
        let index = RegistryIndex {
            model_name: self.model_name.clone(),
            entries: entries.to_vec(),
        };
        write_json_atomic(&self.dir.join(INDEX_FILE), &index, true)
    }
}

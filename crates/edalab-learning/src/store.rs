//! Write-only store of fitted model artifacts.
//!
//! Artifacts are an audit trail: the service writes one per training run and
//! never reads them back.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::{Result, ResultExt};
use crate::models::FittedModel;

/// Extension of stored artifacts.
pub const ARTIFACT_EXTENSION: &str = "pkl";

/// Directory of bincode-encoded models named `{model_type}_{YYYYMMDD_HHMMSS}.pkl`.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open the store at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .context(format!("Creating models directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `model` and return the artifact's file name.
    ///
    /// Two saves of the same model type within one second share a name; the
    /// later one replaces the earlier.
    pub fn save(&self, model: &FittedModel) -> Result<String> {
        let file_name = format!(
            "{}_{}.{ARTIFACT_EXTENSION}",
            model.model_type().as_str(),
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.dir.join(&file_name);

        let bytes = bincode::serialize(model)?;
        std::fs::write(&path, &bytes).context(format!("Writing model to {}", path.display()))?;

        info!(file = %file_name, bytes = bytes.len(), "Model artifact saved");
        Ok(file_name)
    }
}

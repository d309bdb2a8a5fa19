//! Feature metadata exported next to the trained classifier.

use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

fn default_model_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    /// Ties the metadata to a compatible normalizer
    pub schema_version: u32,
    #[serde(default = "default_model_version")]
    pub model_version: String,
    /// Ordered columns the model was trained on
    pub feature_cols: Vec<String>,
    pub cat_cols: Vec<String>,
    pub num_cols: Vec<String>,
    /// Training-time domain per categorical column
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Training-time fill per numeric column
    #[serde(default)]
    pub numeric_defaults: BTreeMap<String, f64>,
    /// Aligned with `feature_cols`
    pub feature_importances: Vec<f32>,
    /// Hex SHA-256 of the model file, checked at load when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_sha256: Option<String>,
}

impl ModelArtifacts {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ScoringError::startup(format!("cannot read metadata {}: {}", path.display(), e))
        })?;
        let artifacts: ModelArtifacts = serde_json::from_str(&data).map_err(|e| {
            ScoringError::startup(format!("corrupt metadata {}: {}", path.display(), e))
        })?;
        artifacts.validate()?;
        info!(
            path = %path.display(),
            model_version = %artifacts.model_version,
            features = artifacts.feature_cols.len(),
            categorical = artifacts.cat_cols.len(),
            "model metadata loaded"
        );
        Ok(artifacts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feature_importances.len() != self.feature_cols.len() {
            return Err(ScoringError::startup(format!(
                "{} feature importances for {} feature columns",
                self.feature_importances.len(),
                self.feature_cols.len()
            )));
        }
        if self.feature_importances.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::startup("feature importances must be finite"));
        }
        Ok(())
    }
}

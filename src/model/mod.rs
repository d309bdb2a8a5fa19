//! Classifier adapter: the capability the pipeline needs from the trained model.

mod artifacts;
mod onnx;

pub use artifacts::ModelArtifacts;
pub use onnx::OnnxClassifier;

use crate::error::Result;
use crate::features::FeatureMatrix;
use serde::{Deserialize, Serialize};

/// Owner of the trained weights. Loaded once, shared read-only.
pub trait Classifier: Send + Sync {
    /// Fraud probability per row, aligned by position with the input.
    fn predict_probability(&self, batch: &FeatureMatrix) -> Result<Vec<f32>>;

    /// Importance per feature, aligned with the training feature list.
    fn feature_importances(&self) -> Vec<f32>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f32,
}

/// Pair names with importances, highest first.
pub fn rank_importances(names: &[String], importances: &[f32]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| FeatureImportance {
            name: name.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

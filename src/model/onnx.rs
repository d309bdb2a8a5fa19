//! ONNX Runtime classifier. Input: [rows, features] f32. Output: fraud probability per row.
//!
//! Probabilities are read either from a plain tensor (`[N, 2]`, `[N, 1]` or `[N]`)
//! or from the ZipMap `seq(map(int64, float))` that default gradient boosting
//! exports emit.

use super::{Classifier, ModelArtifacts};
use crate::config::ModelConfig;
use crate::error::{Result, ScoringError};
use crate::features::FeatureMatrix;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::memory::Allocator;
use ort::value::{DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use tracing::{debug, info};

pub struct OnnxClassifier {
    /// `run` needs exclusive access to the session
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    n_features: usize,
    importances: Vec<f32>,
}

impl OnnxClassifier {
    /// Load the model named in `config`. Any problem here is fatal for the process.
    pub fn load(config: &ModelConfig, artifacts: &ModelArtifacts) -> Result<Self> {
        let path = &config.model_path;
        if !path.exists() {
            return Err(ScoringError::startup(format!(
                "model artifact not found: {}",
                path.display()
            )));
        }

        if let Some(expected) = &artifacts.model_sha256 {
            let bytes = std::fs::read(path).map_err(|e| {
                ScoringError::startup(format!("cannot read model {}: {}", path.display(), e))
            })?;
            let actual = format!("{:x}", Sha256::digest(&bytes));
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(ScoringError::startup(format!(
                    "model checksum mismatch for {}: expected {}, got {}",
                    path.display(),
                    expected,
                    actual
                )));
            }
        }

        let session = Session::builder()
            .map_err(startup_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(startup_err)?
            .with_intra_threads(config.intra_threads)
            .map_err(startup_err)?
            .commit_from_file(path)
            .map_err(startup_err)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ScoringError::startup("model declares no inputs"))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| ScoringError::startup("model declares no outputs"))?;

        info!(
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            threads = config.intra_threads,
            "ONNX classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features: artifacts.feature_cols.len(),
            importances: artifacts.feature_importances.clone(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_probability(&self, batch: &FeatureMatrix) -> Result<Vec<f32>> {
        let rows = batch.nrows();
        if rows == 0 {
            return Ok(Vec::new());
        }
        if batch.ncols() != self.n_features {
            return Err(ScoringError::inference(format!(
                "batch has {} features, model expects {}",
                batch.ncols(),
                self.n_features
            )));
        }

        let shape = vec![rows as i64, batch.ncols() as i64];
        let input = Tensor::from_array((shape, batch.to_row_major())).map_err(inference_err)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ScoringError::inference("session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(inference_err)?;
        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            ScoringError::inference(format!("model produced no `{}` output", self.output_name))
        })?;
        let probs = match output.try_extract_tensor::<f32>() {
            Ok((shape, data)) => {
                let dims: Vec<i64> = shape.iter().copied().collect();
                probabilities_from_tensor(&dims, data, rows)?
            }
            Err(tensor_err) => probabilities_from_zipmap(output, rows).map_err(|zipmap_err| {
                ScoringError::inference(format!(
                    "output `{}` is neither a probability tensor ({}) nor a ZipMap ({})",
                    self.output_name, tensor_err, zipmap_err
                ))
            })?,
        };
        debug!(rows, "ONNX batch scored");
        Ok(probs)
    }

    fn feature_importances(&self) -> Vec<f32> {
        self.importances.clone()
    }
}

/// Pull the positive-class column out of a probability tensor.
fn probabilities_from_tensor(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<f32>> {
    let malformed = || {
        ScoringError::inference(format!(
            "unexpected probability shape {:?} ({} values) for {} rows",
            dims,
            data.len(),
            rows
        ))
    };
    match dims {
        [n, classes] if *n as usize == rows && *classes >= 2 => {
            let stride = *classes as usize;
            if data.len() < rows * stride {
                return Err(malformed());
            }
            Ok(data.chunks_exact(stride).take(rows).map(|row| row[1]).collect())
        }
        [n, 1] | [n] if *n as usize == rows => data.get(..rows).map(<[f32]>::to_vec).ok_or_else(malformed),
        _ => Err(malformed()),
    }
}

/// One `{class: probability}` map per row.
fn probabilities_from_zipmap(output: &DynValue, rows: usize) -> Result<Vec<f32>> {
    let allocator = Allocator::default();
    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(inference_err)?;
    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(inference_err)?;
    if maps.len() != rows {
        return Err(ScoringError::inference(format!(
            "ZipMap has {} entries for {} rows",
            maps.len(),
            rows
        )));
    }
    maps.iter()
        .map(|map| {
            let pairs = map.try_extract_key_values::<i64, f32>().map_err(inference_err)?;
            positive_class_probability(&pairs)
                .ok_or_else(|| ScoringError::inference("ZipMap row has neither class 0 nor class 1"))
        })
        .collect()
}

fn positive_class_probability(pairs: &[(i64, f32)]) -> Option<f32> {
    let class = |c: i64| pairs.iter().find(|(k, _)| *k == c).map(|(_, p)| *p);
    class(1).or_else(|| class(0).map(|p| 1.0 - p))
}

fn startup_err(e: impl std::fmt::Display) -> ScoringError {
    ScoringError::startup(format!("ONNX session: {}", e))
}

fn inference_err(e: impl std::fmt::Display) -> ScoringError {
    ScoringError::inference(e.to_string())
}

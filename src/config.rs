//! Service configuration. Read once at startup; nothing here is tunable per request.

use crate::error::{Result, ScoringError};
use crate::features::ImputationStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the JSON config file.
pub const CONFIG_PATH_ENV: &str = "FRAUD_SCORING_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Classifier artifact and its feature metadata
    pub model: ModelConfig,
    /// Row cap and chunking
    pub batch: BatchConfig,
    /// Feature normalization
    pub features: FeaturesConfig,
    /// Risk fusion inputs
    pub risk: RiskConfig,
    /// HTTP listener
    pub server: ServerConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX classifier
    pub model_path: PathBuf,
    /// Path to the JSON feature metadata exported alongside the model
    pub artifacts_path: PathBuf,
    /// Intra-op threads for the ONNX session
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Rows beyond this count are dropped from a request
    pub max_rows: usize,
    /// Rows per classifier call
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// How numeric columns missing after defaulting are filled
    pub imputation: ImputationStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Constant trust factor applied to every transaction (0.0–1.0)
    pub trust_factor: f64,
    /// Rows with `fraud_score >= flag_threshold` are counted as flagged in batch summaries
    pub flag_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Largest accepted request body. Must hold more than `batch.max_rows`
    /// fully populated rows, since rows past the cap are dropped, not refused.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("lgbm_fraud_model.onnx"),
            artifacts_path: PathBuf::from("ml_artifacts.json"),
            intra_threads: 1,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_rows: 5000,
            chunk_size: 1000,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            trust_factor: 0.9,
            flag_threshold: crate::pipeline::DEFAULT_FLAG_THRESHOLD,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ServiceConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .map_err(|e| ScoringError::Config(format!("{}: {}", path.display(), e)))?;
        let config: ServiceConfig = serde_json::from_str(&data)
            .map_err(|e| ScoringError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path from the environment, falling back to `config.json`.
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.max_rows == 0 {
            return Err(ScoringError::Config("batch.max_rows must be > 0".into()));
        }
        if self.batch.chunk_size == 0 {
            return Err(ScoringError::Config("batch.chunk_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.risk.trust_factor) {
            return Err(ScoringError::Config(format!(
                "risk.trust_factor must be within [0, 1], got {}",
                self.risk.trust_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.risk.flag_threshold) {
            return Err(ScoringError::Config(format!(
                "risk.flag_threshold must be within [0, 1], got {}",
                self.risk.flag_threshold
            )));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ScoringError::Config("server.max_body_bytes must be > 0".into()));
        }
        if self.model.intra_threads == 0 {
            return Err(ScoringError::Config("model.intra_threads must be > 0".into()));
        }
        Ok(())
    }
}

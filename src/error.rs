//! Error taxonomy for the scoring pipeline and its startup phase.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoringError>;

#[derive(Debug, Error)]
pub enum ScoringError {
    /// Input shape or parsing problem; fails the request, never the process.
    #[error("validation error: {0}")]
    Validation(String),

    /// Model artifact or metadata missing, corrupt or incompatible.
    #[error("startup error: {0}")]
    Startup(String),

    /// Classifier failed or returned malformed output.
    #[error("inference error: {0}")]
    Inference(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ScoringError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

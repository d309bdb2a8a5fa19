//! Fraud scoring service: batch of raw transactions in, one fraud decision per transaction out.
//!
//! Modular structure:
//! - [`features`]: Normalization, defaults, derived calendar/amount features
//! - [`model`]: Classifier adapter (ONNX) and its training metadata
//! - [`risk`]: Risk fusion and action decision table
//! - [`pipeline`]: Row cap, chunking and per-request orchestration
//! - [`server`]: HTTP routes and startup loading
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod risk;
pub mod server;
pub mod transaction;

pub use config::ServiceConfig;
pub use error::{Result, ScoringError};
pub use features::{FeatureLayout, FeatureNormalizer, FeatureVector};
pub use logging::StructuredLogger;
pub use model::{Classifier, ModelArtifacts, OnnxClassifier};
pub use pipeline::BatchOrchestrator;
pub use risk::{Action, RiskEngine};
pub use transaction::{RawTransaction, ScoredTransaction};

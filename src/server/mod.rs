//! HTTP boundary: startup loading of the classifier and the JSON routes.

mod error;
pub mod handlers;

pub use error::ApiError;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::features::{FeatureLayout, FeatureNormalizer};
use crate::logging::StructuredLogger;
use crate::model::{Classifier, ModelArtifacts, OnnxClassifier};
use crate::pipeline::BatchOrchestrator;
use crate::risk::RiskEngine;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared, read-only state; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchOrchestrator>,
    pub model_version: Arc<str>,
    /// Request body limit in bytes
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(orchestrator: BatchOrchestrator, model_version: impl Into<Arc<str>>, max_body_bytes: usize) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            model_version: model_version.into(),
            max_body_bytes,
        }
    }

    /// Load metadata and model, resolve the feature layout and wire the pipeline.
    /// Any failure means the process must not serve traffic.
    pub fn load(config: &ServiceConfig) -> Result<Self> {
        let artifacts = ModelArtifacts::load(&config.model.artifacts_path)?;
        let layout = FeatureLayout::from_artifacts(&artifacts)?;
        let classifier: Arc<dyn Classifier> = Arc::new(OnnxClassifier::load(&config.model, &artifacts)?);
        Ok(Self::with_classifier(config, &artifacts, layout, classifier))
    }

    /// Same wiring as [`AppState::load`] with a caller-supplied classifier.
    pub fn with_classifier(
        config: &ServiceConfig,
        artifacts: &ModelArtifacts,
        layout: FeatureLayout,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let normalizer = FeatureNormalizer::new(Arc::new(layout), config.features.imputation);
        let orchestrator = BatchOrchestrator::new(
            normalizer,
            classifier,
            RiskEngine::from_config(&config.risk),
            config.batch.clone(),
        );
        info!(
            model_version = %artifacts.model_version,
            max_rows = config.batch.max_rows,
            chunk_size = config.batch.chunk_size,
            max_body_bytes = config.server.max_body_bytes,
            imputation = ?config.features.imputation,
            "scoring pipeline ready"
        );
        Self::new(
            orchestrator,
            artifacts.model_version.as_str(),
            config.server.max_body_bytes,
        )
    }
}

pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(StructuredLogger::request_span(state.model_version.clone()));
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/apply-threshold", post(handlers::apply_threshold_handler))
        .route("/feature-importance", get(handlers::feature_importance))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(trace)
        .with_state(state)
}

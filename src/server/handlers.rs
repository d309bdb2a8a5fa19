//! Route handlers.

use super::{error::ApiError, AppState};
use crate::model::FeatureImportance;
use crate::pipeline::{apply_threshold, ThresholdReport, ThresholdRow};
use crate::transaction::{RawTransaction, ScoredTransaction};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct PredictionRequest {
    pub rows: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PredictionResponse {
    pub predictions: Vec<ScoredTransaction>,
    pub model_version: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ThresholdRequest {
    pub transactions: Vec<ThresholdRow>,
    pub threshold: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FeatureImportanceResponse {
    pub features: Vec<FeatureImportance>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Fraud Detection ML Service", "status": "active" }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": true,
        "model_version": state.model_version.as_ref(),
    }))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload?;
    let request_id = Uuid::new_v4();
    info!(%request_id, rows = request.rows.len(), "/predict called");

    let orchestrator = state.orchestrator.clone();
    let span = tracing::info_span!("predict", %request_id);
    let outcome = tokio::task::spawn_blocking(move || {
        span.in_scope(|| orchestrator.run_with_summary(&request.rows))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("scoring task failed: {}", e)))??;

    info!(%request_id, predictions = outcome.predictions.len(), "/predict finished");
    Ok(Json(PredictionResponse {
        predictions: outcome.predictions,
        model_version: state.model_version.to_string(),
    }))
}

pub async fn feature_importance(State(state): State<AppState>) -> Json<FeatureImportanceResponse> {
    Json(FeatureImportanceResponse {
        features: state.orchestrator.feature_importances(),
    })
}

/// Re-flag rows a caller already scored; the model is not consulted.
pub async fn apply_threshold_handler(
    payload: Result<Json<ThresholdRequest>, JsonRejection>,
) -> Result<Json<ThresholdReport>, ApiError> {
    let Json(request) = payload?;
    let report = apply_threshold(&request.transactions, request.threshold)?;
    info!(
        rows = report.summary.total,
        threshold = report.summary.threshold,
        flagged = report.summary.flagged_by_threshold,
        "/apply-threshold finished"
    );
    Ok(Json(report))
}

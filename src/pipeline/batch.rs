//! Request rows → capped, chunked scoring. All-or-nothing per request.

use super::analytics::{Analytics, AnalyticsBuilder, Observation};
use crate::config::BatchConfig;
use crate::error::{Result, ScoringError};
use crate::features::{parse_transdatetime, FeatureMatrix, FeatureNormalizer};
use crate::model::{rank_importances, Classifier, FeatureImportance};
use crate::risk::{Action, RiskEngine};
use crate::transaction::{round4, RawTransaction, ScoredTransaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-request counts, for logging and callers that want them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub submitted: usize,
    /// Rows actually scored; less than `submitted` when the cap clipped the request
    pub accepted: usize,
    pub chunks: usize,
    pub approve: usize,
    pub step_up: usize,
    pub manual_review: usize,
    pub block: usize,
    pub flag_threshold: f64,
    /// Rows with `fraud_score >= flag_threshold`
    pub flagged_by_threshold: usize,
}

impl BatchSummary {
    fn record(&mut self, action: Action) {
        match action {
            Action::Approve => self.approve += 1,
            Action::StepUp => self.step_up += 1,
            Action::ManualReview => self.manual_review += 1,
            Action::Block => self.block += 1,
        }
    }

    pub fn clipped(&self) -> usize {
        self.submitted - self.accepted
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub predictions: Vec<ScoredTransaction>,
    pub summary: BatchSummary,
    /// Hour, weekday and amount-range breakdowns at `summary.flag_threshold`
    pub analytics: Analytics,
}

pub struct BatchOrchestrator {
    normalizer: FeatureNormalizer,
    classifier: Arc<dyn Classifier>,
    risk: RiskEngine,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(
        normalizer: FeatureNormalizer,
        classifier: Arc<dyn Classifier>,
        risk: RiskEngine,
        config: BatchConfig,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            risk,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &FeatureNormalizer {
        &self.normalizer
    }

    /// Score rows in order. Rows past `max_rows` are dropped without error.
    pub fn run(&self, rows: &[RawTransaction]) -> Result<Vec<ScoredTransaction>> {
        self.run_with_summary(rows).map(|o| o.predictions)
    }

    pub fn run_with_summary(&self, rows: &[RawTransaction]) -> Result<BatchOutcome> {
        let flag_threshold = self.risk.flag_threshold();
        let mut summary = BatchSummary {
            submitted: rows.len(),
            flag_threshold,
            ..Default::default()
        };
        let mut analytics = AnalyticsBuilder::new(flag_threshold);
        if rows.is_empty() {
            return Ok(BatchOutcome {
                predictions: Vec::new(),
                summary,
                analytics: analytics.analytics(),
            });
        }

        if rows.len() > self.config.max_rows {
            warn!(
                submitted = rows.len(),
                max_rows = self.config.max_rows,
                "clipping rows to cap"
            );
        }
        let accepted = &rows[..rows.len().min(self.config.max_rows)];
        summary.accepted = accepted.len();

        let features_used = Arc::clone(self.normalizer.layout().names());
        let chunk_size = self.config.chunk_size.max(1);
        let mut predictions = Vec::with_capacity(accepted.len());

        for (index, chunk) in accepted.chunks(chunk_size).enumerate() {
            let start = index * chunk_size;
            debug!(start, end = start + chunk.len(), "processing chunk");

            let vectors = self.normalizer.normalize_batch(chunk)?;
            let matrix = FeatureMatrix::from_vectors(&vectors);
            let scores = self.classifier.predict_probability(&matrix)?;
            if scores.len() != chunk.len() {
                return Err(ScoringError::inference(format!(
                    "classifier returned {} probabilities for {} rows",
                    scores.len(),
                    chunk.len()
                )));
            }

            for (tx, &score) in chunk.iter().zip(&scores) {
                if !score.is_finite() {
                    return Err(ScoringError::inference(format!(
                        "non-finite probability for docno {}",
                        tx.docno
                    )));
                }
                let fraud_score = f64::from(score.clamp(0.0, 1.0));
                let r = self.risk.assess(tx, fraud_score);
                summary.record(r.action);
                analytics.record(Observation {
                    fraud_score: round4(r.fraud_score),
                    amount: Some(tx.amount),
                    timestamp: parse_transdatetime(&tx.transdatetime).ok(),
                });
                predictions.push(ScoredTransaction {
                    docno: tx.docno.clone(),
                    fraud_score: round4(r.fraud_score),
                    anomaly: round4(r.anomaly),
                    trust_factor: round4(r.trust_factor),
                    risk: round4(r.risk),
                    action: r.action,
                    features_used: Arc::clone(&features_used),
                });
            }
            summary.chunks += 1;
        }
        summary.flagged_by_threshold = analytics.summary().flagged_by_threshold;

        info!(
            accepted = summary.accepted,
            clipped = summary.clipped(),
            chunks = summary.chunks,
            approve = summary.approve,
            step_up = summary.step_up,
            manual_review = summary.manual_review,
            block = summary.block,
            flagged = summary.flagged_by_threshold,
            "batch scored"
        );
        Ok(BatchOutcome {
            predictions,
            summary,
            analytics: analytics.analytics(),
        })
    }

    /// Feature names with their importances, highest first.
    pub fn feature_importances(&self) -> Vec<FeatureImportance> {
        rank_importances(
            self.normalizer.layout().names(),
            &self.classifier.feature_importances(),
        )
    }
}

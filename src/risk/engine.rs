//! Fuses classifier probability, amount anomaly and trust into a risk score and an action.

use crate::config::RiskConfig;
use crate::pipeline::DEFAULT_FLAG_THRESHOLD;
use crate::transaction::RawTransaction;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Weight of the anomaly heuristic in the fused risk.
pub const ANOMALY_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    StepUp,
    ManualReview,
    Block,
}

impl Action {
    /// Decision table; first matching rule wins.
    pub fn decide(fraud_score: f64, anomaly: f64, trust_factor: f64, risk: f64) -> Self {
        if trust_factor < 0.2 && risk >= 0.4 {
            return Action::Block;
        }
        if risk >= 0.85 {
            return Action::Block;
        }
        if risk >= 0.6
            || (risk >= 0.5 && anomaly >= 0.7)
            || (fraud_score >= 0.6 && trust_factor < 0.4)
        {
            return Action::ManualReview;
        }
        if risk >= 0.4 || (fraud_score >= 0.4 && anomaly >= 0.4) {
            return Action::StepUp;
        }
        Action::Approve
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::StepUp => "step_up",
            Action::ManualReview => "manual_review",
            Action::Block => "block",
        }
    }
}

/// Amount-only step heuristic, independent of the classifier.
pub fn anomaly_score(amount: f64) -> f64 {
    if amount > 100_000.0 {
        0.8
    } else if amount > 50_000.0 {
        0.5
    } else {
        0.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    /// Not clamped; exceeds 1.0 when both inputs are high
    pub risk: f64,
    pub action: Action,
}

/// Pure and total over [0,1]³.
pub fn fuse(fraud_score: f64, anomaly: f64, trust_factor: f64) -> RiskDecision {
    let risk = fraud_score + ANOMALY_WEIGHT * anomaly;
    RiskDecision {
        risk,
        action: Action::decide(fraud_score, anomaly, trust_factor, risk),
    }
}

/// Source of the per-transaction trust factor in [0,1].
pub trait TrustProvider: Send + Sync {
    fn trust_factor(&self, tx: &RawTransaction) -> f64;
}

/// Same trust for everyone until a customer trust model exists.
#[derive(Debug, Clone, Copy)]
pub struct ConstantTrust(pub f64);

impl TrustProvider for ConstantTrust {
    fn trust_factor(&self, _tx: &RawTransaction) -> f64 {
        self.0
    }
}

/// Unrounded signals for one transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskResult {
    pub fraud_score: f64,
    pub anomaly: f64,
    pub trust_factor: f64,
    pub risk: f64,
    pub action: Action,
}

#[derive(Clone)]
pub struct RiskEngine {
    trust: Arc<dyn TrustProvider>,
    flag_threshold: f64,
}

impl RiskEngine {
    pub fn new(trust: Arc<dyn TrustProvider>) -> Self {
        Self {
            trust,
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(Arc::new(ConstantTrust(config.trust_factor))).with_flag_threshold(config.flag_threshold)
    }

    pub fn with_flag_threshold(mut self, threshold: f64) -> Self {
        self.flag_threshold = threshold;
        self
    }

    /// Fraud score at or above which a row counts as flagged in summaries.
    pub fn flag_threshold(&self) -> f64 {
        self.flag_threshold
    }

    pub fn assess(&self, tx: &RawTransaction, fraud_score: f64) -> RiskResult {
        let anomaly = anomaly_score(tx.amount);
        let trust_factor = self.trust.trust_factor(tx);
        let RiskDecision { risk, action } = fuse(fraud_score, anomaly, trust_factor);
        RiskResult {
            fraud_score,
            anomaly,
            trust_factor,
            risk,
            action,
        }
    }
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine")
            .field("flag_threshold", &self.flag_threshold)
            .finish_non_exhaustive()
    }
}

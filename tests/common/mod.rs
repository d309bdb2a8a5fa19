//! Shared fixtures: metadata, transactions and classifier doubles.
#![allow(dead_code)]

use fraud_scoring::config::{BatchConfig, RiskConfig};
use fraud_scoring::error::{Result, ScoringError};
use fraud_scoring::features::{FeatureLayout, FeatureMatrix, FeatureNormalizer, ImputationStrategy};
use fraud_scoring::model::{Classifier, ModelArtifacts};
use fraud_scoring::pipeline::BatchOrchestrator;
use fraud_scoring::risk::RiskEngine;
use fraud_scoring::RawTransaction;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NUMERIC_OPTIONAL: &[&str] = &[
    "monthly_os_changes",
    "monthly_phone_model_changes",
    "logins_last_7_days",
    "logins_last_30_days",
    "login_frequency_7d",
    "login_frequency_30d",
    "freq_change_7d_vs_mean",
    "logins_7d_over_30d_ratio",
    "avg_login_interval_30d",
    "std_login_interval_30d",
    "var_login_interval_30d",
    "ewm_login_interval_7d",
    "burstiness_login_interval",
    "fano_factor_login_interval",
    "zscore_avg_login_interval_7d",
];

pub const CATEGORICAL_OPTIONAL: &[&str] = &["last_phone_model_categorical", "last_os_categorical"];

pub fn artifacts() -> ModelArtifacts {
    let mut num_cols: Vec<String> = [
        "amount",
        "amount_log",
        "dayofweek",
        "is_weekend",
        "hour_3h_bin",
        "tx_count_30d",
        "tx_amount_sum_30d",
        "tx_amount_mean_30d",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    num_cols.extend(NUMERIC_OPTIONAL.iter().map(|s| s.to_string()));

    let mut cat_cols: Vec<String> = CATEGORICAL_OPTIONAL.iter().map(|s| s.to_string()).collect();
    cat_cols.push("direction".to_string());

    let feature_cols: Vec<String> = num_cols.iter().chain(&cat_cols).cloned().collect();
    let feature_importances = (0..feature_cols.len()).map(|i| (i * 7 % 29) as f32 + 0.5).collect();

    let mut categories = BTreeMap::new();
    categories.insert(
        "last_phone_model_categorical".to_string(),
        vec!["samsung".to_string(), "iphone".to_string()],
    );
    categories.insert(
        "last_os_categorical".to_string(),
        vec!["android".to_string(), "ios".to_string()],
    );
    categories.insert("direction".to_string(), vec!["in".to_string(), "out".to_string()]);

    ModelArtifacts {
        schema_version: 1,
        model_version: "1.0.0".to_string(),
        feature_cols,
        cat_cols,
        num_cols,
        categories,
        numeric_defaults: BTreeMap::new(),
        feature_importances,
        model_sha256: None,
    }
}

/// Metadata with an extra numeric column no declared field feeds.
pub fn artifacts_with_extra(column: &str, training_default: f64) -> ModelArtifacts {
    let mut a = artifacts();
    a.num_cols.push(column.to_string());
    a.feature_cols.push(column.to_string());
    a.feature_importances.push(0.1);
    a.numeric_defaults.insert(column.to_string(), training_default);
    a
}

pub fn layout() -> Arc<FeatureLayout> {
    Arc::new(FeatureLayout::from_artifacts(&artifacts()).unwrap())
}

pub fn tx(docno: &str, amount: f64) -> RawTransaction {
    RawTransaction::new(docno, amount, "2024-01-15 13:45:00")
}

/// Deterministic, varied rows with behavioral fields filled in.
pub fn rows(n: usize) -> Vec<RawTransaction> {
    (0..n)
        .map(|i| {
            let mut t = RawTransaction::new(
                format!("doc-{}", i),
                (i * 97 % 130_000) as f64 + 0.5,
                format!("2024-01-{:02} {:02}:{:02}:00", 1 + i % 28, i % 24, i % 60),
            );
            t.cst_dim_id = format!("c{}", i % 50);
            t.direction = if i % 3 == 0 { "in" } else { "out" }.to_string();
            t.logins_last_7_days = Some((i % 11) as f64);
            t.logins_last_30_days = Some((i % 31) as f64);
            t.last_os_categorical = Some(if i % 2 == 0 { "ios" } else { "android" }.to_string());
            t
        })
        .collect()
}

/// Row-local probability derived from the feature values only.
pub struct StubClassifier {
    pub calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub importances: Vec<f32>,
}

impl StubClassifier {
    pub fn new(importances: Vec<f32>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            importances,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for StubClassifier {
    fn predict_probability(&self, batch: &FeatureMatrix) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(batch.nrows());
        Ok(batch
            .view()
            .rows()
            .into_iter()
            .map(|row| (row.sum().abs() * 0.001).fract())
            .collect())
    }

    fn feature_importances(&self) -> Vec<f32> {
        self.importances.clone()
    }
}

/// Always fails, like a broken model runtime.
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict_probability(&self, _batch: &FeatureMatrix) -> Result<Vec<f32>> {
        Err(ScoringError::inference("runtime exploded"))
    }

    fn feature_importances(&self) -> Vec<f32> {
        Vec::new()
    }
}

/// Returns one probability too few.
pub struct ShortClassifier;

impl Classifier for ShortClassifier {
    fn predict_probability(&self, batch: &FeatureMatrix) -> Result<Vec<f32>> {
        Ok(vec![0.5; batch.nrows().saturating_sub(1)])
    }

    fn feature_importances(&self) -> Vec<f32> {
        Vec::new()
    }
}

pub fn orchestrator(classifier: Arc<dyn Classifier>) -> BatchOrchestrator {
    orchestrator_with(classifier, BatchConfig::default(), ImputationStrategy::default(), layout())
}

pub fn orchestrator_with(
    classifier: Arc<dyn Classifier>,
    batch: BatchConfig,
    imputation: ImputationStrategy,
    layout: Arc<FeatureLayout>,
) -> BatchOrchestrator {
    BatchOrchestrator::new(
        FeatureNormalizer::new(layout, imputation),
        classifier,
        RiskEngine::from_config(&RiskConfig::default()),
        batch,
    )
}

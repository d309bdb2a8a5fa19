//! Pipeline benchmark: full request path with an in-process classifier (no ONNX runtime).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fraud_scoring::config::{BatchConfig, RiskConfig};
use fraud_scoring::features::{FeatureLayout, FeatureMatrix, FeatureNormalizer, ImputationStrategy};
use fraud_scoring::model::{Classifier, ModelArtifacts};
use fraud_scoring::pipeline::BatchOrchestrator;
use fraud_scoring::risk::{fuse, RiskEngine};
use fraud_scoring::RawTransaction;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mean of the row, squashed into (0, 1).
struct LogisticStub {
    importances: Vec<f32>,
}

impl Classifier for LogisticStub {
    fn predict_probability(&self, batch: &FeatureMatrix) -> fraud_scoring::Result<Vec<f32>> {
        Ok(batch
            .view()
            .rows()
            .into_iter()
            .map(|row| {
                let z = row.mean().unwrap_or(0.0) * 1e-3;
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }

    fn feature_importances(&self) -> Vec<f32> {
        self.importances.clone()
    }
}

fn bench_artifacts() -> ModelArtifacts {
    let num_cols: Vec<String> = ["amount", "amount_log", "dayofweek", "is_weekend", "hour_3h_bin", "logins_last_7_days"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let cat_cols = vec!["direction".to_string()];
    let feature_cols: Vec<String> = num_cols.iter().chain(&cat_cols).cloned().collect();
    let mut categories = BTreeMap::new();
    categories.insert("direction".to_string(), vec!["in".to_string(), "out".to_string()]);

    ModelArtifacts {
        schema_version: 1,
        model_version: "bench".to_string(),
        feature_importances: (0..feature_cols.len()).map(|i| i as f32).collect(),
        feature_cols,
        cat_cols,
        num_cols,
        categories,
        numeric_defaults: BTreeMap::new(),
        model_sha256: None,
    }
}

fn make_rows(n: usize) -> Vec<RawTransaction> {
    (0..n)
        .map(|i| {
            let mut t = RawTransaction::new(
                format!("doc-{}", i),
                (i * 977 % 160_000) as f64,
                format!("2024-05-{:02}T{:02}:30:00", 1 + i % 28, i % 24),
            );
            t.direction = if i % 4 == 0 { "in" } else { "out" }.to_string();
            t
        })
        .collect()
}

fn orchestrator() -> BatchOrchestrator {
    let artifacts = bench_artifacts();
    let layout = FeatureLayout::from_artifacts(&artifacts).expect("bench metadata");
    BatchOrchestrator::new(
        FeatureNormalizer::new(Arc::new(layout), ImputationStrategy::default()),
        Arc::new(LogisticStub {
            importances: artifacts.feature_importances,
        }),
        RiskEngine::from_config(&RiskConfig::default()),
        BatchConfig::default(),
    )
}

fn bench_fuse(c: &mut Criterion) {
    c.bench_function("risk_fuse", |b| {
        b.iter(|| black_box(fuse(black_box(0.42), black_box(0.5), black_box(0.9))))
    });
}

fn bench_request(c: &mut Criterion) {
    let orch = orchestrator();
    let mut group = c.benchmark_group("score_request");
    group.sample_size(20);
    for size in [1usize, 1000, 5000] {
        let rows = make_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| black_box(orch.run(black_box(rows)).expect("score")))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fuse, bench_request);
criterion_main!(benches);

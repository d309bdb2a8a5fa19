//! Feature normalization: defaults, derived features, category coercion, layout validation.

mod common;

use fraud_scoring::features::{FeatureLayout, FeatureNormalizer, FeatureValue, ImputationStrategy, RARE};
use fraud_scoring::ScoringError;
use std::sync::Arc;

fn normalizer() -> FeatureNormalizer {
    FeatureNormalizer::new(common::layout(), ImputationStrategy::default())
}

#[test]
fn omitted_optional_fields_take_defaults() {
    let n = normalizer();
    let layout = n.layout().clone();
    let fv = n.normalize(&common::tx("d1", 500.0)).unwrap();

    assert_eq!(fv.values.len(), layout.len());
    for name in common::NUMERIC_OPTIONAL {
        assert_eq!(fv.get(&layout, name), Some(&FeatureValue::Numeric(0.0)), "{}", name);
    }
    for name in common::CATEGORICAL_OPTIONAL {
        assert_eq!(fv.get(&layout, name).and_then(FeatureValue::as_label), Some(RARE), "{}", name);
    }
    for name in ["tx_count_30d", "tx_amount_sum_30d", "tx_amount_mean_30d"] {
        assert_eq!(fv.get(&layout, name), Some(&FeatureValue::Numeric(0.0)), "{}", name);
    }
}

#[test]
fn aggregates_ignore_caller_supplied_extras() {
    let n = normalizer();
    let layout = n.layout().clone();
    let mut tx = common::tx("d1", 500.0);
    tx.extra.insert("tx_count_30d".into(), serde_json::json!(42));
    let fv = n.normalize(&tx).unwrap();
    assert_eq!(fv.get(&layout, "tx_count_30d"), Some(&FeatureValue::Numeric(0.0)));
}

#[test]
fn derives_calendar_and_amount_features() {
    let n = normalizer();
    let layout = n.layout().clone();
    // 2024-01-13 is a Saturday
    let tx = fraud_scoring::RawTransaction::new("d1", 999.0, "2024-01-13 23:10:05");
    let fv = n.normalize(&tx).unwrap();

    let num = |name: &str| fv.get(&layout, name).and_then(FeatureValue::as_number).unwrap();
    assert_eq!(num("dayofweek"), 5.0);
    assert_eq!(num("is_weekend"), 1.0);
    assert_eq!(num("hour_3h_bin"), 7.0);
    assert!((num("amount_log") - 1000f64.ln()).abs() < 1e-12);
    assert_eq!(num("amount"), 999.0);
}

#[test]
fn weekday_morning() {
    let n = normalizer();
    let layout = n.layout().clone();
    let tx = fraud_scoring::RawTransaction::new("d1", 0.0, "2024-01-17T02:59:59");
    let fv = n.normalize(&tx).unwrap();
    let num = |name: &str| fv.get(&layout, name).and_then(FeatureValue::as_number).unwrap();
    assert_eq!(num("dayofweek"), 2.0);
    assert_eq!(num("is_weekend"), 0.0);
    assert_eq!(num("hour_3h_bin"), 0.0);
    assert_eq!(num("amount_log"), 0.0);
}

#[test]
fn supplied_values_pass_through_and_unknown_categories_collapse() {
    let n = normalizer();
    let layout = n.layout().clone();
    let mut tx = common::tx("d1", 10.0);
    tx.logins_last_7_days = Some(4.0);
    tx.last_os_categorical = Some("ios".to_string());
    tx.last_phone_model_categorical = Some("nokia-3310".to_string());
    tx.direction = "sideways".to_string();
    let fv = n.normalize(&tx).unwrap();

    assert_eq!(fv.get(&layout, "logins_last_7_days"), Some(&FeatureValue::Numeric(4.0)));
    match fv.get(&layout, "last_os_categorical") {
        Some(FeatureValue::Category(c)) => {
            assert_eq!(c.label.as_ref(), "ios");
            assert_eq!(c.code, 1);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        fv.get(&layout, "last_phone_model_categorical").and_then(FeatureValue::as_label),
        Some(RARE)
    );
    assert_eq!(fv.get(&layout, "direction").and_then(FeatureValue::as_label), Some(RARE));
}

#[test]
fn bad_datetime_is_validation_error() {
    let tx = fraud_scoring::RawTransaction::new("d1", 10.0, "31/31/2024 99:00");
    let err = normalizer().normalize(&tx).unwrap_err();
    assert!(err.is_validation(), "{}", err);
}

#[test]
fn blank_text_fields_are_scored() {
    let n = normalizer();
    let layout = n.layout().clone();
    let mut tx = common::tx("", 10.0);
    tx.cst_dim_id = "  ".to_string();
    tx.transdate = String::new();
    tx.direction = String::new();
    let fv = n.normalize(&tx).unwrap();
    assert_eq!(fv.docno, "");
    assert_eq!(fv.get(&layout, "direction").and_then(FeatureValue::as_label), Some(RARE));
}

#[test]
fn blank_transdatetime_is_validation_error() {
    let mut tx = common::tx("d1", 10.0);
    tx.transdatetime = " ".to_string();
    let err = normalizer().normalize(&tx).unwrap_err();
    assert!(matches!(err, ScoringError::Validation(_)));
}

#[test]
fn small_negative_amount_is_scored() {
    let n = normalizer();
    let layout = n.layout().clone();
    let fv = n.normalize(&common::tx("refund", -0.5)).unwrap();
    let log = fv.get(&layout, "amount_log").and_then(FeatureValue::as_number).unwrap();
    assert!(log.is_finite() && log < 0.0);
}

#[test]
fn amount_without_finite_log_is_validation_error() {
    for amount in [-1.0, -5.0, f64::NAN, f64::INFINITY] {
        let err = normalizer().normalize(&common::tx("d1", amount)).unwrap_err();
        assert!(err.is_validation(), "{}", amount);
    }
}

#[test]
fn extra_column_uses_training_default_when_absent() {
    let layout = Arc::new(FeatureLayout::from_artifacts(&common::artifacts_with_extra("merchant_score", 0.37)).unwrap());
    let n = FeatureNormalizer::new(layout.clone(), ImputationStrategy::TrainingDefaults);

    let absent = n.normalize(&common::tx("d1", 10.0)).unwrap();
    assert_eq!(absent.get(&layout, "merchant_score"), Some(&FeatureValue::Numeric(0.37)));

    let mut tx = common::tx("d2", 10.0);
    tx.extra.insert("merchant_score".into(), serde_json::json!(0.9));
    let present = n.normalize(&tx).unwrap();
    assert_eq!(present.get(&layout, "merchant_score"), Some(&FeatureValue::Numeric(0.9)));
}

#[test]
fn batch_median_fills_from_chunk() {
    let layout = Arc::new(FeatureLayout::from_artifacts(&common::artifacts_with_extra("merchant_score", 0.37)).unwrap());
    let n = FeatureNormalizer::new(layout.clone(), ImputationStrategy::BatchMedian);

    let mut rows = vec![common::tx("a", 1.0), common::tx("b", 1.0), common::tx("c", 1.0), common::tx("d", 1.0)];
    rows[0].extra.insert("merchant_score".into(), serde_json::json!(1.0));
    rows[1].extra.insert("merchant_score".into(), serde_json::json!(2.0));
    rows[2].extra.insert("merchant_score".into(), serde_json::json!(6.0));

    let out = n.normalize_batch(&rows).unwrap();
    assert_eq!(out[3].get(&layout, "merchant_score"), Some(&FeatureValue::Numeric(2.0)));
    assert_eq!(out[2].get(&layout, "merchant_score"), Some(&FeatureValue::Numeric(6.0)));

    // nothing observed in the batch: 0.0, not the training default
    let alone = n.normalize(&common::tx("e", 1.0)).unwrap();
    assert_eq!(alone.get(&layout, "merchant_score"), Some(&FeatureValue::Numeric(0.0)));
}

#[test]
fn layout_rejects_unknown_schema_version() {
    let mut a = common::artifacts();
    a.schema_version = 2;
    let err = FeatureLayout::from_artifacts(&a).unwrap_err();
    assert!(matches!(err, ScoringError::Startup(_)));
}

#[test]
fn layout_rejects_kind_mismatch() {
    let mut a = common::artifacts();
    a.num_cols.retain(|c| c != "logins_last_7_days");
    a.cat_cols.push("logins_last_7_days".to_string());
    assert!(FeatureLayout::from_artifacts(&a).is_err());

    let mut b = common::artifacts();
    b.cat_cols.retain(|c| c != "last_os_categorical");
    b.num_cols.push("last_os_categorical".to_string());
    assert!(FeatureLayout::from_artifacts(&b).is_err());
}

#[test]
fn layout_rejects_untyped_and_duplicate_columns() {
    let mut a = common::artifacts();
    a.feature_cols.push("mystery".to_string());
    assert!(FeatureLayout::from_artifacts(&a).is_err());

    let mut b = common::artifacts();
    b.feature_cols.push("amount".to_string());
    assert!(FeatureLayout::from_artifacts(&b).is_err());

    let mut c = common::artifacts();
    c.num_cols.push("orphan".to_string());
    assert!(FeatureLayout::from_artifacts(&c).is_err());
}

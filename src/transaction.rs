//! Request and response records: one `RawTransaction` in, one `ScoredTransaction` out.

use crate::risk::Action;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Transaction as submitted by the caller. Optional behavioral signals that are
/// absent mean "unknown", not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Output key; not guaranteed unique within a request
    pub docno: String,
    pub cst_dim_id: String,
    pub transdate: String,
    pub transdatetime: String,
    pub amount: f64,
    pub direction: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_os_changes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_phone_model_changes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_phone_model_categorical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_os_categorical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logins_last_7_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logins_last_30_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_frequency_7d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_frequency_30d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_change_7d_vs_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logins_7d_over_30d_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_login_interval_30d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_login_interval_30d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_login_interval_30d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ewm_login_interval_7d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burstiness_login_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fano_factor_login_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zscore_avg_login_interval_7d: Option<f64>,

    /// Keys outside the fixed schema, consulted for model columns the
    /// normalizer has no declared source for.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A field looked up by its column name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Number(Option<f64>),
    Text(Option<&'a str>),
    /// Not a declared field of the transaction record
    Unknown,
}

impl RawTransaction {
    /// Minimal valid transaction, mostly for tests and benches.
    pub fn new(docno: impl Into<String>, amount: f64, transdatetime: impl Into<String>) -> Self {
        let transdatetime = transdatetime.into();
        let transdate = transdatetime.get(..10).unwrap_or_default().to_string();
        Self {
            docno: docno.into(),
            cst_dim_id: "0".to_string(),
            transdate,
            transdatetime,
            amount,
            direction: "out".to_string(),
            ..Default::default()
        }
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> FieldRef<'_> {
        use FieldRef::{Number, Text};
        match name {
            "docno" => Text(Some(&self.docno)),
            "cst_dim_id" => Text(Some(&self.cst_dim_id)),
            "transdate" => Text(Some(&self.transdate)),
            "transdatetime" => Text(Some(&self.transdatetime)),
            "direction" => Text(Some(&self.direction)),
            "amount" => Number(Some(self.amount)),
            "monthly_os_changes" => Number(self.monthly_os_changes),
            "monthly_phone_model_changes" => Number(self.monthly_phone_model_changes),
            "last_phone_model_categorical" => Text(self.last_phone_model_categorical.as_deref()),
            "last_os_categorical" => Text(self.last_os_categorical.as_deref()),
            "logins_last_7_days" => Number(self.logins_last_7_days),
            "logins_last_30_days" => Number(self.logins_last_30_days),
            "login_frequency_7d" => Number(self.login_frequency_7d),
            "login_frequency_30d" => Number(self.login_frequency_30d),
            "freq_change_7d_vs_mean" => Number(self.freq_change_7d_vs_mean),
            "logins_7d_over_30d_ratio" => Number(self.logins_7d_over_30d_ratio),
            "avg_login_interval_30d" => Number(self.avg_login_interval_30d),
            "std_login_interval_30d" => Number(self.std_login_interval_30d),
            "var_login_interval_30d" => Number(self.var_login_interval_30d),
            "ewm_login_interval_7d" => Number(self.ewm_login_interval_7d),
            "burstiness_login_interval" => Number(self.burstiness_login_interval),
            "fano_factor_login_interval" => Number(self.fano_factor_login_interval),
            "zscore_avg_login_interval_7d" => Number(self.zscore_avg_login_interval_7d),
            _ => FieldRef::Unknown,
        }
    }

    /// Numeric value of an extra (undeclared) key; null and non-numbers are absent.
    pub fn extra_number(&self, name: &str) -> Option<f64> {
        self.extra.get(name).and_then(serde_json::Value::as_f64)
    }

    pub fn extra_text(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(serde_json::Value::as_str)
    }
}

/// Decision for one transaction. Numbers are rounded to 4 decimals here and
/// only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransaction {
    pub docno: String,
    pub fraud_score: f64,
    pub anomaly: f64,
    pub trust_factor: f64,
    pub risk: f64,
    pub action: Action,
    pub features_used: Arc<[String]>,
}

/// Round for presentation.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

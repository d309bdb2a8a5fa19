//! Declarative field schema and the column layout resolved from model metadata.
//!
//! Every optional request field and every aggregate the model may consume is
//! listed once in [`OPTIONAL_FIELDS`] with its type and default. At startup the
//! model's declared columns are checked against this table and each column gets
//! a resolved [`ColumnSource`], so nothing is re-derived per request.

use crate::error::{Result, ScoringError};
use crate::model::ModelArtifacts;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Metadata schema version this normalizer understands.
pub const SCHEMA_VERSION: u32 = 1;

/// Catch-all category for unknown or absent categorical values.
pub const RARE: &str = "rare";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Number(f64),
    Category(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical,
}

/// One optional input with its default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: FieldDefault,
    /// `false` for aggregates callers never supply; those always take the default.
    pub supplied: bool,
}

impl FieldSpec {
    const fn number(name: &'static str) -> Self {
        Self {
            name,
            default: FieldDefault::Number(0.0),
            supplied: true,
        }
    }

    const fn category(name: &'static str) -> Self {
        Self {
            name,
            default: FieldDefault::Category(RARE),
            supplied: true,
        }
    }

    const fn aggregate(name: &'static str) -> Self {
        Self {
            name,
            default: FieldDefault::Number(0.0),
            supplied: false,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self.default {
            FieldDefault::Number(_) => FieldKind::Numeric,
            FieldDefault::Category(_) => FieldKind::Categorical,
        }
    }
}

pub const OPTIONAL_FIELDS: &[FieldSpec] = &[
    // 30-day aggregates: feature store lookup not wired in
    FieldSpec::aggregate("tx_count_30d"),
    FieldSpec::aggregate("tx_amount_sum_30d"),
    FieldSpec::aggregate("tx_amount_mean_30d"),
    FieldSpec::number("monthly_os_changes"),
    FieldSpec::number("monthly_phone_model_changes"),
    FieldSpec::number("logins_last_7_days"),
    FieldSpec::number("logins_last_30_days"),
    FieldSpec::number("login_frequency_7d"),
    FieldSpec::number("login_frequency_30d"),
    FieldSpec::number("freq_change_7d_vs_mean"),
    FieldSpec::number("logins_7d_over_30d_ratio"),
    FieldSpec::number("avg_login_interval_30d"),
    FieldSpec::number("std_login_interval_30d"),
    FieldSpec::number("var_login_interval_30d"),
    FieldSpec::number("ewm_login_interval_7d"),
    FieldSpec::number("burstiness_login_interval"),
    FieldSpec::number("fano_factor_login_interval"),
    FieldSpec::number("zscore_avg_login_interval_7d"),
    FieldSpec::category("last_phone_model_categorical"),
    FieldSpec::category("last_os_categorical"),
];

pub fn optional_field(name: &str) -> Option<&'static FieldSpec> {
    OPTIONAL_FIELDS.iter().find(|f| f.name == name)
}

/// Features computed from `transdatetime` and `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedFeature {
    DayOfWeek,
    IsWeekend,
    Hour3hBin,
    AmountLog,
}

impl DerivedFeature {
    pub const ALL: [DerivedFeature; 4] = [
        DerivedFeature::DayOfWeek,
        DerivedFeature::IsWeekend,
        DerivedFeature::Hour3hBin,
        DerivedFeature::AmountLog,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DerivedFeature::DayOfWeek => "dayofweek",
            DerivedFeature::IsWeekend => "is_weekend",
            DerivedFeature::Hour3hBin => "hour_3h_bin",
            DerivedFeature::AmountLog => "amount_log",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

/// Required text fields of the record that a model may treat as categories.
const RECORD_TEXT_FIELDS: &[&str] = &["direction", "cst_dim_id"];

/// Where a model column's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    Derived(DerivedFeature),
    /// `amount`
    Amount,
    /// Declared optional field; absent values take the field default
    Optional(&'static FieldSpec),
    /// Required text field of the record
    Record(&'static str),
    /// Not declared anywhere; read from the request's extra keys
    Extra,
}

/// Training-time category domain for one column. Always contains [`RARE`].
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDomain {
    labels: Vec<Arc<str>>,
    rare_code: usize,
}

impl CategoryDomain {
    pub fn new<S: AsRef<str>>(known: &[S]) -> Self {
        let mut labels: Vec<Arc<str>> = Vec::with_capacity(known.len() + 1);
        for k in known {
            let k = k.as_ref();
            if !labels.iter().any(|l| l.as_ref() == k) {
                labels.push(Arc::from(k));
            }
        }
        let rare_code = match labels.iter().position(|l| l.as_ref() == RARE) {
            Some(i) => i,
            None => {
                labels.push(Arc::from(RARE));
                labels.len() - 1
            }
        };
        Self { labels, rare_code }
    }

    /// Map a value into the domain; unknown and absent values become `rare`.
    pub fn coerce(&self, value: Option<&str>) -> super::Category {
        let code = value
            .and_then(|v| self.labels.iter().position(|l| l.as_ref() == v))
            .unwrap_or(self.rare_code);
        super::Category {
            label: Arc::clone(&self.labels[code]),
            code,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.as_ref())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Numeric {
        /// Training-time fill for values still missing after defaulting
        fill: f64,
    },
    Categorical(CategoryDomain),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub source: ColumnSource,
}

/// Ordered model columns with their resolved sources. Built once at startup.
#[derive(Debug, Clone)]
pub struct FeatureLayout {
    columns: Vec<ColumnSpec>,
    names: Arc<[String]>,
}

impl FeatureLayout {
    /// Resolve and validate the model's declared columns against the field schema.
    pub fn from_artifacts(artifacts: &ModelArtifacts) -> Result<Self> {
        if artifacts.schema_version != SCHEMA_VERSION {
            return Err(ScoringError::startup(format!(
                "metadata schema_version {} is not supported (expected {})",
                artifacts.schema_version, SCHEMA_VERSION
            )));
        }
        if artifacts.feature_cols.is_empty() {
            return Err(ScoringError::startup("metadata lists no feature columns"));
        }

        let numeric: HashSet<&str> = artifacts.num_cols.iter().map(String::as_str).collect();
        let categorical: HashSet<&str> = artifacts.cat_cols.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(artifacts.feature_cols.len());

        for name in &artifacts.feature_cols {
            if !seen.insert(name.as_str()) {
                return Err(ScoringError::startup(format!("duplicate feature column `{}`", name)));
            }
            let kind = match (numeric.contains(name.as_str()), categorical.contains(name.as_str())) {
                (true, false) => FieldKind::Numeric,
                (false, true) => FieldKind::Categorical,
                (true, true) => {
                    return Err(ScoringError::startup(format!(
                        "column `{}` is declared both numeric and categorical",
                        name
                    )))
                }
                (false, false) => {
                    return Err(ScoringError::startup(format!(
                        "column `{}` is neither in num_cols nor cat_cols",
                        name
                    )))
                }
            };
            let source = resolve_source(name);
            check_kind(name, &source, kind)?;
            if source == ColumnSource::Extra {
                warn!(column = %name, "model column has no declared source; read from extra request fields");
            }

            let kind = match kind {
                FieldKind::Numeric => {
                    let fill = artifacts.numeric_defaults.get(name).copied().unwrap_or(0.0);
                    if !fill.is_finite() {
                        return Err(ScoringError::startup(format!(
                            "numeric default for `{}` is not finite",
                            name
                        )));
                    }
                    ColumnKind::Numeric { fill }
                }
                FieldKind::Categorical => {
                    let domain = match artifacts.categories.get(name) {
                        Some(known) => CategoryDomain::new(known),
                        None => {
                            warn!(column = %name, "no training categories recorded; every value maps to rare");
                            CategoryDomain::new::<&str>(&[])
                        }
                    };
                    ColumnKind::Categorical(domain)
                }
            };
            columns.push(ColumnSpec {
                name: name.clone(),
                kind,
                source,
            });
        }

        for listed in artifacts.num_cols.iter().chain(&artifacts.cat_cols) {
            if !seen.contains(listed.as_str()) {
                return Err(ScoringError::startup(format!(
                    "column `{}` is typed but missing from feature_cols",
                    listed
                )));
            }
        }

        debug!(columns = columns.len(), "feature layout resolved");
        let names: Arc<[String]> = columns.iter().map(|c| c.name.clone()).collect();
        Ok(Self { columns, names })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Ordered feature names the classifier consumes.
    pub fn names(&self) -> &Arc<[String]> {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

fn resolve_source(name: &str) -> ColumnSource {
    if let Some(d) = DerivedFeature::from_name(name) {
        return ColumnSource::Derived(d);
    }
    if name == "amount" {
        return ColumnSource::Amount;
    }
    if let Some(field) = optional_field(name) {
        return ColumnSource::Optional(field);
    }
    if let Some(field) = RECORD_TEXT_FIELDS.iter().find(|f| **f == name) {
        return ColumnSource::Record(*field);
    }
    ColumnSource::Extra
}

fn check_kind(name: &str, source: &ColumnSource, declared: FieldKind) -> Result<()> {
    let expected = match source {
        ColumnSource::Derived(_) | ColumnSource::Amount => Some(FieldKind::Numeric),
        ColumnSource::Optional(field) => Some(field.kind()),
        ColumnSource::Record(_) => Some(FieldKind::Categorical),
        ColumnSource::Extra => None,
    };
    match expected {
        Some(k) if k != declared => Err(ScoringError::startup(format!(
            "column `{}` is declared {:?} by the model but the normalizer produces {:?}",
            name, declared, k
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_always_has_rare() {
        let d = CategoryDomain::new(&["ios", "android"]);
        assert_eq!(d.len(), 3);
        assert_eq!(d.coerce(Some("android")).code, 1);
        assert_eq!(d.coerce(Some("symbian")).label.as_ref(), RARE);
        assert_eq!(d.coerce(None).code, 2);
    }

    #[test]
    fn existing_rare_keeps_its_code() {
        let d = CategoryDomain::new(&["rare", "ios"]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.coerce(Some("blackberry")).code, 0);
    }

    #[test]
    fn schema_table_is_consistent() {
        let names: HashSet<_> = OPTIONAL_FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names.len(), OPTIONAL_FIELDS.len());
        assert_eq!(OPTIONAL_FIELDS.iter().filter(|f| !f.supplied).count(), 3);
        assert_eq!(
            OPTIONAL_FIELDS.iter().filter(|f| f.kind() == FieldKind::Categorical).count(),
            2
        );
    }

    #[test]
    fn sources_resolve_by_name() {
        assert_eq!(resolve_source("hour_3h_bin"), ColumnSource::Derived(DerivedFeature::Hour3hBin));
        assert_eq!(resolve_source("amount"), ColumnSource::Amount);
        assert_eq!(resolve_source("direction"), ColumnSource::Record("direction"));
        assert_eq!(resolve_source("merchant_score"), ColumnSource::Extra);
        assert!(matches!(resolve_source("tx_count_30d"), ColumnSource::Optional(s) if !s.supplied));
    }
}

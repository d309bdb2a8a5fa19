//! Raw transaction → feature vector. Pure; no I/O.

use super::impute::{impute, ImputationStrategy};
use super::schema::{ColumnKind, ColumnSource, DerivedFeature, FieldDefault};
use super::{FeatureLayout, FeatureValue, FeatureVector, PartialVector};
use crate::error::{Result, ScoringError};
use crate::transaction::{FieldRef, RawTransaction};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::sync::Arc;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Parse `transdatetime`. Offsets are kept as the wall clock of that offset.
pub fn parse_transdatetime(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt);
    }
    Err(ScoringError::validation(format!(
        "transdatetime `{}` cannot be parsed",
        raw
    )))
}

struct Derived {
    dayofweek: u32,
    hour: u32,
    amount_log: f64,
}

impl Derived {
    fn value(&self, feature: DerivedFeature) -> f64 {
        match feature {
            DerivedFeature::DayOfWeek => self.dayofweek as f64,
            DerivedFeature::IsWeekend => {
                if self.dayofweek >= 5 {
                    1.0
                } else {
                    0.0
                }
            }
            DerivedFeature::Hour3hBin => (self.hour / 3) as f64,
            DerivedFeature::AmountLog => self.amount_log,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    layout: Arc<FeatureLayout>,
    imputation: ImputationStrategy,
}

impl FeatureNormalizer {
    pub fn new(layout: Arc<FeatureLayout>, imputation: ImputationStrategy) -> Self {
        Self { layout, imputation }
    }

    pub fn layout(&self) -> &Arc<FeatureLayout> {
        &self.layout
    }

    pub fn imputation(&self) -> ImputationStrategy {
        self.imputation
    }

    /// Normalize a single transaction as a batch of one.
    pub fn normalize(&self, tx: &RawTransaction) -> Result<FeatureVector> {
        let partial = self.resolve(tx)?;
        let mut out = impute(vec![partial], &self.layout, self.imputation);
        Ok(out.remove(0))
    }

    /// Normalize rows that share one classifier call. Fails on the first bad row.
    pub fn normalize_batch(&self, rows: &[RawTransaction]) -> Result<Vec<FeatureVector>> {
        let partials = rows
            .iter()
            .map(|tx| self.resolve(tx))
            .collect::<Result<Vec<_>>>()?;
        Ok(impute(partials, &self.layout, self.imputation))
    }

    fn resolve(&self, tx: &RawTransaction) -> Result<PartialVector> {
        validate_amount(tx)?;
        let ts = parse_transdatetime(&tx.transdatetime)?;
        let derived = Derived {
            dayofweek: ts.weekday().num_days_from_monday(),
            hour: ts.hour(),
            amount_log: tx.amount.ln_1p(),
        };

        let values = self
            .layout
            .columns()
            .iter()
            .map(|col| match &col.kind {
                ColumnKind::Numeric { .. } => numeric_cell(tx, &col.name, &col.source, &derived),
                ColumnKind::Categorical(domain) => {
                    let raw = text_cell(tx, &col.name, &col.source);
                    Some(FeatureValue::Category(domain.coerce(raw)))
                }
            })
            .collect();

        Ok(PartialVector {
            docno: tx.docno.clone(),
            amount: tx.amount,
            values,
        })
    }
}

/// Rejects amounts that cannot produce a finite `amount_log`.
fn validate_amount(tx: &RawTransaction) -> Result<()> {
    if !tx.amount.is_finite() || tx.amount <= -1.0 {
        return Err(ScoringError::validation(format!(
            "amount {} cannot be scored (docno {})",
            tx.amount, tx.docno
        )));
    }
    Ok(())
}

fn numeric_cell(
    tx: &RawTransaction,
    name: &str,
    source: &ColumnSource,
    derived: &Derived,
) -> Option<FeatureValue> {
    let value = match source {
        ColumnSource::Derived(d) => Some(derived.value(*d)),
        ColumnSource::Amount => Some(tx.amount),
        ColumnSource::Optional(field) => {
            let default = match field.default {
                FieldDefault::Number(v) => v,
                FieldDefault::Category(_) => 0.0,
            };
            if !field.supplied {
                Some(default)
            } else {
                match tx.field(field.name) {
                    FieldRef::Number(v) => Some(v.unwrap_or(default)),
                    _ => Some(default),
                }
            }
        }
        ColumnSource::Record(_) => None,
        ColumnSource::Extra => tx.extra_number(name),
    };
    value.map(FeatureValue::Numeric)
}

fn text_cell<'a>(tx: &'a RawTransaction, name: &str, source: &ColumnSource) -> Option<&'a str> {
    match source {
        ColumnSource::Optional(field) => match tx.field(field.name) {
            FieldRef::Text(v) => v,
            _ => None,
        },
        ColumnSource::Record(field) => match tx.field(field) {
            FieldRef::Text(v) => v,
            _ => None,
        },
        ColumnSource::Extra => tx.extra_text(name),
        ColumnSource::Derived(_) | ColumnSource::Amount => None,
    }
}

//! Threshold summary and hour / weekday / amount-range breakdowns over scored rows.
//!
//! A row is flagged when `fraud_score >= threshold`. Breakdowns use the wall
//! clock of `transdatetime`; weekdays count from Sunday (0) as analyst
//! dashboards expect, unlike the Monday-based `dayofweek` model feature.

use crate::error::{Result, ScoringError};
use crate::features::parse_transdatetime;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_FLAG_THRESHOLD: f64 = 0.8;

/// Half-open `[min, max)` amount ranges.
const AMOUNT_RANGES: [(&str, f64, f64); 6] = [
    ("0-100", 0.0, 100.0),
    ("100-500", 100.0, 500.0),
    ("500-1000", 500.0, 1000.0),
    ("1000-5000", 1000.0, 5000.0),
    ("5000-10000", 5000.0, 10000.0),
    ("10000+", 10000.0, f64::INFINITY),
];

const SCORE_BANDS: [&str; 5] = ["0.0-0.2", "0.2-0.4", "0.4-0.6", "0.6-0.8", "0.8-1.0"];

pub fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ScoringError::validation(format!(
            "threshold must be a number between 0 and 1, got {}",
            threshold
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSummary {
    pub total: usize,
    pub flagged_by_threshold: usize,
    pub threshold: f64,
    /// Percent of `total`, two decimals
    pub flagged_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBucket {
    pub hour: u32,
    pub count: usize,
    pub flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayBucket {
    /// 0 = Sunday
    pub weekday: u32,
    pub count: usize,
    pub flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRangeBucket {
    pub label: String,
    pub count: usize,
    pub flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub by_hour: Vec<HourBucket>,
    pub by_weekday: Vec<WeekdayBucket>,
    pub by_amount_range: Vec<AmountRangeBucket>,
    /// Row count per fraud score band
    pub score_distribution: BTreeMap<String, usize>,
}

/// One scored row as seen by the analytics. Rows without a usable timestamp
/// or amount are left out of the matching breakdown only.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub fraud_score: f64,
    pub amount: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
}

/// Accumulates [`ThresholdSummary`] and [`Analytics`] in one pass.
#[derive(Debug, Clone)]
pub struct AnalyticsBuilder {
    threshold: f64,
    total: usize,
    flagged: usize,
    by_hour: [(usize, usize); 24],
    by_weekday: [(usize, usize); 7],
    by_amount: [(usize, usize); AMOUNT_RANGES.len()],
    score_bands: [usize; SCORE_BANDS.len()],
}

impl AnalyticsBuilder {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            total: 0,
            flagged: 0,
            by_hour: [(0, 0); 24],
            by_weekday: [(0, 0); 7],
            by_amount: [(0, 0); AMOUNT_RANGES.len()],
            score_bands: [0; SCORE_BANDS.len()],
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_flagged(&self, fraud_score: f64) -> bool {
        fraud_score >= self.threshold
    }

    pub fn record(&mut self, obs: Observation) {
        let flagged = usize::from(self.is_flagged(obs.fraud_score));
        self.total += 1;
        self.flagged += flagged;

        if let Some(ts) = obs.timestamp {
            let hour = &mut self.by_hour[ts.hour() as usize];
            hour.0 += 1;
            hour.1 += flagged;
            let day = &mut self.by_weekday[ts.weekday().num_days_from_sunday() as usize];
            day.0 += 1;
            day.1 += flagged;
        }

        if let Some(amount) = obs.amount {
            if let Some(i) = AMOUNT_RANGES
                .iter()
                .position(|(_, min, max)| amount >= *min && amount < *max)
            {
                self.by_amount[i].0 += 1;
                self.by_amount[i].1 += flagged;
            }
        }

        if let Some(band) = score_band(obs.fraud_score) {
            self.score_bands[band] += 1;
        }
    }

    pub fn summary(&self) -> ThresholdSummary {
        let flagged_percentage = if self.total == 0 {
            0.0
        } else {
            (self.flagged as f64 / self.total as f64 * 10_000.0).round() / 100.0
        };
        ThresholdSummary {
            total: self.total,
            flagged_by_threshold: self.flagged,
            threshold: self.threshold,
            flagged_percentage,
        }
    }

    pub fn analytics(&self) -> Analytics {
        Analytics {
            by_hour: (0u32..)
                .zip(&self.by_hour)
                .map(|(hour, &(count, flagged))| HourBucket { hour, count, flagged })
                .collect(),
            by_weekday: (0u32..)
                .zip(&self.by_weekday)
                .map(|(weekday, &(count, flagged))| WeekdayBucket {
                    weekday,
                    count,
                    flagged,
                })
                .collect(),
            by_amount_range: AMOUNT_RANGES
                .iter()
                .zip(&self.by_amount)
                .map(|((label, _, _), &(count, flagged))| AmountRangeBucket {
                    label: label.to_string(),
                    count,
                    flagged,
                })
                .collect(),
            score_distribution: SCORE_BANDS
                .iter()
                .zip(&self.score_bands)
                .map(|(label, &n)| (label.to_string(), n))
                .collect(),
        }
    }
}

fn score_band(score: f64) -> Option<usize> {
    if !(0.0..=1.0).contains(&score) {
        return None;
    }
    Some([0.2, 0.4, 0.6, 0.8].iter().filter(|edge| score >= **edge).count())
}

/// Previously scored row submitted for re-thresholding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRow {
    pub docno: String,
    pub fraud_score: f64,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub transdatetime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdReport {
    pub summary: ThresholdSummary,
    pub analytics: Analytics,
    /// In submission order
    pub flagged_docnos: Vec<String>,
}

/// Re-apply a flagging threshold to already scored rows. No model call.
pub fn apply_threshold(rows: &[ThresholdRow], threshold: f64) -> Result<ThresholdReport> {
    check_threshold(threshold)?;
    let mut builder = AnalyticsBuilder::new(threshold);
    let mut flagged_docnos = Vec::new();

    for row in rows {
        let timestamp = row
            .transdatetime
            .as_deref()
            .and_then(|raw| match parse_transdatetime(raw) {
                Ok(ts) => Some(ts),
                Err(_) => {
                    debug!(docno = %row.docno, transdatetime = raw, "skipping row in time breakdowns");
                    None
                }
            });
        if builder.is_flagged(row.fraud_score) {
            flagged_docnos.push(row.docno.clone());
        }
        builder.record(Observation {
            fraud_score: row.fraud_score,
            amount: row.amount,
            timestamp,
        });
    }

    Ok(ThresholdReport {
        summary: builder.summary(),
        analytics: builder.analytics(),
        flagged_docnos,
    })
}

//! Fill numeric cells that are still missing after schema defaults.

use super::{ColumnKind, FeatureLayout, FeatureValue, FeatureVector, PartialVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Per-column fill recorded at training time; rows are independent.
    #[default]
    TrainingDefaults,
    /// Median of the column over the current chunk, 0.0 when nothing is
    /// observed. A row's value then depends on the rows it is batched with.
    BatchMedian,
}

pub(crate) fn impute(
    partials: Vec<PartialVector>,
    layout: &FeatureLayout,
    strategy: ImputationStrategy,
) -> Vec<FeatureVector> {
    let fills: Vec<Option<f64>> = layout
        .columns()
        .iter()
        .enumerate()
        .map(|(j, col)| {
            if !partials.iter().any(|p| p.values[j].is_none()) {
                return None;
            }
            let fill = match (&col.kind, strategy) {
                (ColumnKind::Numeric { fill }, ImputationStrategy::TrainingDefaults) => *fill,
                (_, ImputationStrategy::BatchMedian) => {
                    let observed = partials
                        .iter()
                        .filter_map(|p| p.values[j].as_ref().and_then(FeatureValue::as_number))
                        .collect();
                    median(observed).unwrap_or(0.0)
                }
                (ColumnKind::Categorical(_), _) => 0.0,
            };
            Some(fill)
        })
        .collect();

    partials
        .into_iter()
        .map(|p| FeatureVector {
            docno: p.docno,
            amount: p.amount,
            values: p
                .values
                .into_iter()
                .zip(&fills)
                .map(|(v, fill)| v.unwrap_or_else(|| FeatureValue::Numeric(fill.unwrap_or(0.0))))
                .collect(),
        })
        .collect()
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

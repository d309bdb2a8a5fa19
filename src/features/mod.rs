//! Feature normalization: raw transaction → fixed-schema vector → classifier matrix.

mod impute;
mod normalizer;
pub mod schema;

pub use impute::ImputationStrategy;
pub use normalizer::{parse_transdatetime, FeatureNormalizer};
pub use schema::{CategoryDomain, ColumnKind, ColumnSource, FeatureLayout, RARE, SCHEMA_VERSION};

use ndarray::{Array2, ArrayView2};
use std::sync::Arc;

/// Categorical value coerced into the training domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub label: Arc<str>,
    /// Position in the training domain; what the classifier sees
    pub code: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Category(Category),
}

impl FeatureValue {
    pub fn as_f32(&self) -> f32 {
        match self {
            FeatureValue::Numeric(v) => *v as f32,
            FeatureValue::Category(c) => c.code as f32,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(c) => Some(c.label.as_ref()),
            FeatureValue::Numeric(_) => None,
        }
    }
}

/// One fully resolved row, aligned with [`FeatureLayout::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub docno: String,
    /// Raw amount, kept for the anomaly heuristic
    pub amount: f64,
    pub values: Vec<FeatureValue>,
}

impl FeatureVector {
    pub fn get(&self, layout: &FeatureLayout, name: &str) -> Option<&FeatureValue> {
        layout.position(name).and_then(|i| self.values.get(i))
    }
}

/// Row before imputation; only numeric cells can be `None`.
#[derive(Debug, Clone)]
pub(crate) struct PartialVector {
    pub docno: String,
    pub amount: f64,
    pub values: Vec<Option<FeatureValue>>,
}

/// Dense `rows × features` classifier input.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    data: Array2<f32>,
}

impl FeatureMatrix {
    pub fn from_vectors(vectors: &[FeatureVector]) -> Self {
        let cols = vectors.first().map_or(0, |v| v.values.len());
        let data = Array2::from_shape_fn((vectors.len(), cols), |(i, j)| vectors[i].values[j].as_f32());
        Self { data }
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Row-major copy of the values.
    pub fn to_row_major(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

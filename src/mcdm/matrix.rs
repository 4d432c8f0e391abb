use anyhow::{Result, ensure};
use ndarray::{Array2, ArrayView1};

use crate::{records::SpatialRecordSet, score::MergedScores};

/// Cells by criteria. `NaN` marks a missing value; normalized matrices
/// hold none.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaMatrix {
    ids: Vec<String>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl CriteriaMatrix {
    pub fn new(ids: Vec<String>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        ensure!(values.nrows() == ids.len(), "matrix has {} rows for {} ids", values.nrows(), ids.len());
        ensure!(values.ncols() == columns.len(), "matrix has {} columns for {} names", values.ncols(), columns.len());
        Ok(Self { ids, columns, values })
    }

    /// Build from plain rows; convenient for small tables.
    pub fn from_rows(ids: &[&str], columns: &[&str], rows: &[Vec<f64>]) -> Result<Self> {
        ensure!(rows.iter().all(|r| r.len() == columns.len()), "ragged rows");
        let values = Array2::from_shape_fn((rows.len(), columns.len()), |(i, j)| rows[i][j]);
        Self::new(
            ids.iter().map(|s| s.to_string()).collect(),
            columns.iter().map(|s| s.to_string()).collect(),
            values,
        )
    }

    /// The criterion columns of a merged table; nulls become `NaN`.
    pub fn from_merged(merged: &MergedScores) -> Result<Self> {
        let ids = merged.cell_ids()?;
        let columns = merged.criteria().to_vec();
        let mut values = Array2::from_elem((ids.len(), columns.len()), f64::NAN);
        for (j, name) in columns.iter().enumerate() {
            for (i, v) in merged.values(name)?.into_iter().enumerate() {
                if let Some(v) = v { values[[i, j]] = v }
            }
        }
        Self::new(ids, columns, values)
    }

    /// Numeric `columns` of a record set keyed by `cell_id`; absent or
    /// unparseable values become `NaN`.
    pub fn from_records(set: &SpatialRecordSet, columns: &[String]) -> Result<Self> {
        let ids = set.iter().map(|r| r.str("cell_id").unwrap_or_else(|| r.id.clone())).collect::<Vec<_>>();
        let records = set.records();
        let values = Array2::from_shape_fn((records.len(), columns.len()), |(i, j)| {
            records[i].f64(&columns[j]).unwrap_or(f64::NAN)
        });
        Self::new(ids, columns.to_vec(), values)
    }

    #[inline] pub fn nrows(&self) -> usize { self.values.nrows() }

    #[inline] pub fn ncols(&self) -> usize { self.values.ncols() }

    #[inline] pub fn ids(&self) -> &[String] { &self.ids }

    #[inline] pub fn columns(&self) -> &[String] { &self.columns }

    #[inline] pub fn values(&self) -> &Array2<f64> { &self.values }

    #[inline] pub fn column(&self, j: usize) -> ArrayView1<'_, f64> { self.values.column(j) }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    pub(super) fn with_values(&self, values: Array2<f64>) -> Self {
        Self { ids: self.ids.clone(), columns: self.columns.clone(), values }
    }
}

/// Non-negative criterion weights summing to 1, aligned with matrix columns.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    columns: Vec<String>,
    weights: Vec<f64>,
}

impl WeightVector {
    /// Weights are rescaled to sum to 1; an all-zero vector becomes uniform.
    pub fn new(columns: Vec<String>, weights: Vec<f64>) -> Result<Self> {
        ensure!(columns.len() == weights.len(), "{} weights for {} columns", weights.len(), columns.len());
        ensure!(weights.iter().all(|w| w.is_finite() && *w >= 0.0), "weights must be finite and non-negative");
        let total = weights.iter().sum::<f64>();
        if total <= 0.0 {
            return Ok(Self::equal(columns));
        }
        Ok(Self { columns, weights: weights.into_iter().map(|w| w / total).collect() })
    }

    /// `1/k` for each of the k columns.
    pub fn equal(columns: Vec<String>) -> Self {
        let k = columns.len();
        Self { weights: vec![1.0 / k as f64; k], columns }
    }

    #[inline] pub fn len(&self) -> usize { self.weights.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.weights.is_empty() }

    #[inline] pub fn columns(&self) -> &[String] { &self.columns }

    #[inline] pub fn as_slice(&self) -> &[f64] { &self.weights }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns.iter().position(|c| c == column).map(|j| self.weights[j])
    }
}

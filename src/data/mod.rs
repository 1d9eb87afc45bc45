//! Named tabular feature matrices
//!
//! A [`FeatureMatrix`] is the only data shape the pipeline consumes: an
//! `Array2<f64>` whose column order and names identify each feature.

mod loader;

pub use loader::{labels_from_dataframe, DataLoader, DataSaver};

use crate::error::{GlassboxError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Numeric feature matrix with named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    /// Wrap a row-major array with its column names
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(GlassboxError::ShapeError {
                expected: format!("{} column names", values.ncols()),
                actual: format!("{} column names", names.len()),
            });
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(GlassboxError::InvalidInput(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
        }
        Ok(Self { names, values })
    }

    /// Wrap an array using generated names `feature_0`, `feature_1`, ...
    pub fn from_array(values: Array2<f64>) -> Self {
        let names = (0..values.ncols()).map(|i| format!("feature_{}", i)).collect();
        Self { names, values }
    }

    /// Build from every column of a DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        Self::from_dataframe_columns(df, &names)
    }

    /// Build from the named columns of a DataFrame, in the given order.
    /// Columns are cast to `Float64`; nulls become `0.0`.
    pub fn from_dataframe_columns(df: &DataFrame, col_names: &[String]) -> Result<Self> {
        let n_rows = df.height();
        let n_cols = col_names.len();

        let col_data: Vec<Vec<f64>> = col_names
            .iter()
            .map(|col_name| {
                let column = df
                    .column(col_name)
                    .map_err(|_| GlassboxError::FeatureNotFound(col_name.clone()))?;
                let series_f64 = column
                    .as_materialized_series()
                    .cast(&DataType::Float64)
                    .map_err(|e| GlassboxError::DataError(format!("column '{}': {}", col_name, e)))?;
                let values: Vec<f64> = series_f64
                    .f64()
                    .map_err(|e| GlassboxError::DataError(e.to_string()))?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();
                Ok(values)
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        let values = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]);
        Self::new(col_names.to_vec(), values)
    }

    /// Convert back into a DataFrame with `Float64` columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .names
            .iter()
            .zip(self.values.columns())
            .map(|(name, col)| Column::new(name.as_str().into(), col.to_vec()))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// Column names in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Underlying values
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// True when there are no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0 || self.n_features() == 0
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    /// Position of a column by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// New matrix holding only the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_new_rejects_name_mismatch() {
        let result = FeatureMatrix::new(vec!["a".to_string()], array![[1.0, 2.0]]);
        assert!(matches!(result, Err(GlassboxError::ShapeError { .. })));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = FeatureMatrix::new(
            vec!["a".to_string(), "a".to_string()],
            array![[1.0, 2.0]],
        );
        assert!(matches!(result, Err(GlassboxError::InvalidInput(_))));
    }

    #[test]
    fn test_generated_names() {
        let matrix = FeatureMatrix::from_array(array![[1.0, 2.0, 3.0]]);
        assert_eq!(matrix.names(), &["feature_0", "feature_1", "feature_2"]);
        assert_eq!(matrix.index_of("feature_2"), Some(2));
    }

    #[test]
    fn test_from_dataframe_casts_and_fills_nulls() {
        let df = DataFrame::new(vec![
            Column::new("ints".into(), &[1i64, 2, 3]),
            Column::new("floats".into(), &[Some(0.5), None, Some(1.5)]),
        ])
        .unwrap();

        let matrix = FeatureMatrix::from_dataframe(&df).unwrap();
        assert_eq!(matrix.names(), &["ints", "floats"]);
        assert_eq!(matrix.values(), &array![[1.0, 0.5], [2.0, 0.0], [3.0, 1.5]]);
    }

    #[test]
    fn test_missing_column() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[1.0, 2.0])]).unwrap();
        let result = FeatureMatrix::from_dataframe_columns(&df, &["b".to_string()]);
        assert!(matches!(result, Err(GlassboxError::FeatureNotFound(name)) if name == "b"));
    }

    #[test]
    fn test_dataframe_round_trip() {
        let matrix = FeatureMatrix::new(
            vec!["x".to_string(), "y".to_string()],
            array![[1.0, 2.0], [3.0, 4.0]],
        )
        .unwrap();
        let df = matrix.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(FeatureMatrix::from_dataframe(&df).unwrap(), matrix);
    }

    #[test]
    fn test_select_rows() {
        let matrix = FeatureMatrix::from_array(array![[1.0], [2.0], [3.0]]);
        let picked = matrix.select_rows(&[2, 0]);
        assert_eq!(picked.values(), &array![[3.0], [1.0]]);
        assert_eq!(picked.names(), matrix.names());
    }
}

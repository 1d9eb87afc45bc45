//! CSV loading and saving for feature matrices and label files

use super::FeatureMatrix;
use crate::error::{GlassboxError, Result};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// CSV loader with a configurable separator
#[derive(Debug, Clone)]
pub struct DataLoader {
    separator: u8,
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self {
            separator: b',',
            infer_schema_length: 100,
        }
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            GlassboxError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default().with_separator(self.separator);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| GlassboxError::DataError(e.to_string()))?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded CSV");
        Ok(df)
    }

    /// Load a CSV file whose columns are all features
    pub fn load_features(&self, path: impl AsRef<Path>) -> Result<FeatureMatrix> {
        let df = self.load_csv(path)?;
        FeatureMatrix::from_dataframe(&df)
    }

    /// Load class labels from a CSV file; uses `column` or the first column
    pub fn load_labels(&self, path: impl AsRef<Path>, column: Option<&str>) -> Result<Array1<usize>> {
        let df = self.load_csv(path)?;
        labels_from_dataframe(&df, column)
    }
}

/// Extract a non-negative integer label column from a DataFrame
pub fn labels_from_dataframe(df: &DataFrame, column: Option<&str>) -> Result<Array1<usize>> {
    let name = match column {
        Some(name) => name.to_string(),
        None => df
            .get_column_names()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| GlassboxError::DataError("label file has no columns".to_string()))?,
    };

    let series = df
        .column(&name)
        .map_err(|_| GlassboxError::FeatureNotFound(name.clone()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
            Some(v) => Err(GlassboxError::InvalidInput(format!(
                "label {} at row {} is not a class index",
                v, row
            ))),
            None => Err(GlassboxError::InvalidInput(format!(
                "missing label at row {}",
                row
            ))),
        })
        .collect::<Result<Vec<usize>>>()
        .map(Array1::from_vec)
}

/// Writes DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save a DataFrame as CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| GlassboxError::DataError(e.to_string()))
    }

    /// Save a feature matrix as CSV
    pub fn save_features(matrix: &FeatureMatrix, path: impl AsRef<Path>) -> Result<()> {
        let mut df = matrix.to_dataframe()?;
        Self::save_csv(&mut df, path)
    }

    /// Save class labels as a single-column CSV
    pub fn save_labels(labels: &Array1<usize>, column: &str, path: impl AsRef<Path>) -> Result<()> {
        let values: Vec<u64> = labels.iter().map(|&l| l as u64).collect();
        let mut df = DataFrame::new(vec![Column::new(column.into(), values)])?;
        Self::save_csv(&mut df, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_load_features() {
        let file = write_csv("a,b,c\n1,2,3\n4,5,6\n7,8,9\n");
        let matrix = DataLoader::new().load_features(file.path()).unwrap();
        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.names(), &["a", "b", "c"]);
        assert_eq!(matrix.values()[[2, 1]], 8.0);
    }

    #[test]
    fn test_load_labels_first_column() {
        let file = write_csv("target\n0\n1\n2\n1\n");
        let labels = DataLoader::new().load_labels(file.path(), None).unwrap();
        assert_eq!(labels, array![0, 1, 2, 1]);
    }

    #[test]
    fn test_load_labels_rejects_fractional() {
        let file = write_csv("target\n0\n1.5\n");
        let result = DataLoader::new().load_labels(file.path(), Some("target"));
        assert!(matches!(result, Err(GlassboxError::InvalidInput(_))));
    }

    #[test]
    fn test_save_and_reload_features() {
        let matrix = FeatureMatrix::from_array(array![[0.5, -1.0], [2.0, 3.25]]);
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        DataSaver::save_features(&matrix, file.path()).unwrap();

        let loaded = DataLoader::new().load_features(file.path()).unwrap();
        assert_eq!(loaded, matrix);
    }

    #[test]
    fn test_save_and_reload_labels() {
        let labels = array![1usize, 0, 1];
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        DataSaver::save_labels(&labels, "label", file.path()).unwrap();

        let loaded = DataLoader::new().load_labels(file.path(), Some("label")).unwrap();
        assert_eq!(loaded, labels);
    }

    #[test]
    fn test_tab_separated() {
        let file = write_csv("x\ty\n1\t2\n");
        let matrix = DataLoader::new()
            .with_separator(b'\t')
            .load_features(file.path())
            .unwrap();
        assert_eq!(matrix.names(), &["x", "y"]);
    }
}

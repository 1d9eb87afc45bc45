//! Error types for glassbox

use thiserror::Error;

/// Result type alias for glassbox operations
pub type Result<T> = std::result::Result<T, GlassboxError>;

/// Main error type for the distillation pipeline
#[derive(Error, Debug)]
pub enum GlassboxError {
    /// The black-box model exposes neither class probabilities nor hard labels
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GlassboxError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        GlassboxError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for GlassboxError {
    fn from(err: polars::error::PolarsError) -> Self {
        GlassboxError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for GlassboxError {
    fn from(err: serde_json::Error) -> Self {
        GlassboxError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for GlassboxError {
    fn from(err: ndarray::ShapeError) -> Self {
        GlassboxError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GlassboxError::UnsupportedModel("no predict capability".to_string());
        assert_eq!(err.to_string(), "Unsupported model: no predict capability");
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = GlassboxError::invalid_parameter("max_depth", 0, "must be in 1..=15");
        assert_eq!(
            err.to_string(),
            "Invalid parameter: max_depth = 0, must be in 1..=15"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GlassboxError = io_err.into();
        assert!(matches!(err, GlassboxError::IoError(_)));
    }
}

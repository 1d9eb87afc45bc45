//! Black-box model capability interface
//!
//! A black box is anything that can score a feature matrix. The pipeline
//! never looks inside it: it asks [`BlackBoxModel::capabilities`] which of
//! the two prediction methods are implemented and calls only those.
//!
//! Input compatibility is a precondition. A matrix whose width differs from
//! what the model was trained on is passed through unchanged, and whatever
//! error the model reports is propagated as-is.

mod random_forest;

pub use random_forest::{MaxFeatures, RandomForest};

use crate::error::{GlassboxError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prediction methods a black box implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// `predict_proba` returns one probability column per class index
    pub probabilities: bool,
    /// `predict_labels` returns one class index per row
    pub labels: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        probabilities: false,
        labels: false,
    };
    pub const PROBABILITIES: Self = Self {
        probabilities: true,
        labels: false,
    };
    pub const LABELS: Self = Self {
        probabilities: false,
        labels: true,
    };
    pub const ALL: Self = Self {
        probabilities: true,
        labels: true,
    };

    /// True when neither prediction method is available
    pub fn is_empty(&self) -> bool {
        !self.probabilities && !self.labels
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.probabilities, self.labels) {
            (true, true) => write!(f, "probabilities+labels"),
            (true, false) => write!(f, "probabilities"),
            (false, true) => write!(f, "labels"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// An opaque classifier whose decisions are to be distilled
pub trait BlackBoxModel: Send + Sync {
    /// Which of the prediction methods below are implemented
    fn capabilities(&self) -> Capabilities;

    /// Per-class probabilities, shape `(n_rows, n_classes)`; column `j` is class `j`
    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(GlassboxError::UnsupportedModel(
            "model does not expose class probabilities".to_string(),
        ))
    }

    /// One hard class index per row
    fn predict_labels(&self, _x: &Array2<f64>) -> Result<Array1<usize>> {
        Err(GlassboxError::UnsupportedModel(
            "model does not expose hard labels".to_string(),
        ))
    }

    /// Short name used in logs and reports
    fn name(&self) -> &str {
        "black-box"
    }
}

impl<T: BlackBoxModel + ?Sized> BlackBoxModel for Box<T> {
    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        (**self).predict_proba(x)
    }

    fn predict_labels(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        (**self).predict_labels(x)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Black box backed by a probability closure
pub struct ProbabilityFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array2<f64>> + Send + Sync,
{
    predict_fn: F,
    name: String,
}

impl<F> ProbabilityFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array2<f64>> + Send + Sync,
{
    pub fn new(predict_fn: F) -> Self {
        Self {
            predict_fn,
            name: "probability-fn".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> BlackBoxModel for ProbabilityFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array2<f64>> + Send + Sync,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::PROBABILITIES
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        (self.predict_fn)(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Black box backed by a hard-label closure
pub struct LabelFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<usize>> + Send + Sync,
{
    predict_fn: F,
    name: String,
}

impl<F> LabelFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<usize>> + Send + Sync,
{
    pub fn new(predict_fn: F) -> Self {
        Self {
            predict_fn,
            name: "label-fn".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> BlackBoxModel for LabelFn<F>
where
    F: Fn(&Array2<f64>) -> Result<Array1<usize>> + Send + Sync,
{
    fn capabilities(&self) -> Capabilities {
        Capabilities::LABELS
    }

    fn predict_labels(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        (self.predict_fn)(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Opaque;

    impl BlackBoxModel for Opaque {
        fn capabilities(&self) -> Capabilities {
            Capabilities::NONE
        }
    }

    #[test]
    fn test_capabilities_display() {
        assert_eq!(Capabilities::ALL.to_string(), "probabilities+labels");
        assert_eq!(Capabilities::NONE.to_string(), "none");
        assert!(Capabilities::NONE.is_empty());
        assert!(!Capabilities::LABELS.is_empty());
    }

    #[test]
    fn test_default_methods_are_unsupported() {
        let x = array![[1.0]];
        assert!(matches!(
            Opaque.predict_proba(&x),
            Err(GlassboxError::UnsupportedModel(_))
        ));
        assert!(matches!(
            Opaque.predict_labels(&x),
            Err(GlassboxError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_closure_adapters() {
        let proba = ProbabilityFn::new(|x: &Array2<f64>| {
            Ok(Array2::from_shape_fn((x.nrows(), 2), |(_, j)| j as f64))
        })
        .with_name("constant");
        assert_eq!(proba.capabilities(), Capabilities::PROBABILITIES);
        assert_eq!(proba.name(), "constant");
        assert_eq!(proba.predict_proba(&array![[0.0]]).unwrap(), array![[0.0, 1.0]]);

        let labels = LabelFn::new(|x: &Array2<f64>| Ok(Array1::from_elem(x.nrows(), 3)));
        assert_eq!(labels.capabilities(), Capabilities::LABELS);
        assert_eq!(labels.predict_labels(&array![[0.0], [1.0]]).unwrap(), array![3, 3]);

        let boxed: Box<dyn BlackBoxModel> = Box::new(labels);
        assert_eq!(boxed.capabilities(), Capabilities::LABELS);
    }
}

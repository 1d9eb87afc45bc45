//! Accuracy and fidelity of surrogates
//!
//! Accuracy compares a classifier with ground truth; fidelity compares it
//! with the black box it was distilled from. Both treat a missing model as
//! a zero score rather than an error.

mod report;

pub use report::{DistillationReport, Distiller, StrategyReport, TeacherSummary};

use crate::blackbox::BlackBoxModel;
use crate::error::{GlassboxError, Result};
use crate::labels::generate_pseudo_labels;
use crate::surrogate::Classifier;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of rows where `model` predicts `y_true`.
///
/// `None` scores 0.0; an empty matrix scores 0.0.
pub fn evaluate_accuracy(
    model: Option<&dyn Classifier>,
    x: &Array2<f64>,
    y_true: &Array1<usize>,
) -> Result<f64> {
    let Some(model) = model else {
        return Ok(0.0);
    };
    if x.nrows() != y_true.len() {
        return Err(GlassboxError::InvalidInput(format!(
            "{} rows but {} labels",
            x.nrows(),
            y_true.len()
        )));
    }
    if x.nrows() == 0 {
        return Ok(0.0);
    }
    let predictions = model.predict(x)?;
    agreement(&predictions, y_true)
}

/// Fraction of rows where `candidate` agrees with the black box's hard
/// prediction, derived the same way as pseudo-labels.
///
/// Either model missing scores 0.0.
pub fn evaluate_fidelity(
    candidate: Option<&dyn Classifier>,
    blackbox: Option<&dyn BlackBoxModel>,
    x: &Array2<f64>,
) -> Result<f64> {
    let (Some(candidate), Some(blackbox)) = (candidate, blackbox) else {
        return Ok(0.0);
    };
    let reference = generate_pseudo_labels(x, blackbox)?;
    evaluate_accuracy(Some(candidate), x, &reference)
}

fn agreement(predictions: &Array1<usize>, truth: &Array1<usize>) -> Result<f64> {
    if predictions.len() != truth.len() {
        return Err(GlassboxError::InvalidInput(format!(
            "classifier returned {} predictions for {} rows",
            predictions.len(),
            truth.len()
        )));
    }
    let hits = predictions
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p == t)
        .count();
    Ok(hits as f64 / truth.len() as f64)
}

/// Qualitative band for a fidelity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FidelityLevel {
    /// Below 0.8
    Low,
    /// 0.8 up to 0.95
    Good,
    /// 0.95 and above
    Excellent,
}

impl FidelityLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.8 {
            FidelityLevel::Low
        } else if score < 0.95 {
            FidelityLevel::Good
        } else {
            FidelityLevel::Excellent
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FidelityLevel::Low => {
                "Fidelity is low; the surrogate may not imitate the black box well. \
                 Try a deeper tree or another surrogate family."
            }
            FidelityLevel::Good => "Fidelity is good; the surrogate approximates the black box well.",
            FidelityLevel::Excellent => "Excellent fidelity; the surrogate imitates the black box closely.",
        }
    }
}

impl fmt::Display for FidelityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FidelityLevel::Low => write!(f, "low"),
            FidelityLevel::Good => write!(f, "good"),
            FidelityLevel::Excellent => write!(f, "excellent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackbox::LabelFn;
    use ndarray::array;

    struct Constant(usize);

    impl Classifier for Constant {
        fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
            Ok(Array1::from_elem(x.nrows(), self.0))
        }
    }

    #[test]
    fn test_accuracy() {
        let x = Array2::zeros((4, 1));
        let y = array![1, 1, 0, 1];
        assert_eq!(evaluate_accuracy(Some(&Constant(1)), &x, &y).unwrap(), 0.75);
        assert_eq!(evaluate_accuracy(None, &x, &y).unwrap(), 0.0);
    }

    #[test]
    fn test_accuracy_edge_cases() {
        let empty = Array2::zeros((0, 2));
        assert_eq!(
            evaluate_accuracy(Some(&Constant(0)), &empty, &Array1::zeros(0)).unwrap(),
            0.0
        );
        assert!(matches!(
            evaluate_accuracy(Some(&Constant(0)), &Array2::zeros((3, 1)), &array![0, 1]),
            Err(GlassboxError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fidelity() {
        let x = array![[-1.0], [1.0], [2.0], [-3.0]];
        let blackbox = LabelFn::new(|x: &Array2<f64>| Ok(x.column(0).mapv(|v| (v > 0.0) as usize)));
        let score = evaluate_fidelity(Some(&Constant(1)), Some(&blackbox), &x).unwrap();
        assert_eq!(score, 0.5);
        assert_eq!(evaluate_fidelity(None, Some(&blackbox), &x).unwrap(), 0.0);
        assert_eq!(evaluate_fidelity(Some(&Constant(1)), None, &x).unwrap(), 0.0);
    }

    #[test]
    fn test_fidelity_levels() {
        assert_eq!(FidelityLevel::from_score(0.79), FidelityLevel::Low);
        assert_eq!(FidelityLevel::from_score(0.8), FidelityLevel::Good);
        assert_eq!(FidelityLevel::from_score(0.9499), FidelityLevel::Good);
        assert_eq!(FidelityLevel::from_score(0.95), FidelityLevel::Excellent);
        assert_eq!(FidelityLevel::Excellent.to_string(), "excellent");
    }
}

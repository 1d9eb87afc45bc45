//! Pseudo-label generation
//!
//! Turns black-box outputs into hard class indices that a surrogate can be
//! trained on. Probabilities win over hard labels when a model offers both.

use crate::blackbox::BlackBoxModel;
use crate::error::{GlassboxError, Result};
use crate::utils::argmax;
use ndarray::{Array1, Array2};
use tracing::debug;

/// One class index per row of `x`.
///
/// Probability argmax ties go to the lowest class index and NaN never wins.
/// Errors raised by the model propagate unchanged.
pub fn generate_pseudo_labels(x: &Array2<f64>, model: &dyn BlackBoxModel) -> Result<Array1<usize>> {
    let caps = model.capabilities();

    if caps.probabilities {
        let proba = model.predict_proba(x)?;
        if proba.nrows() != x.nrows() {
            return Err(GlassboxError::InvalidInput(format!(
                "{} returned {} probability rows for {} input rows",
                model.name(),
                proba.nrows(),
                x.nrows()
            )));
        }
        if proba.ncols() == 0 {
            return Err(GlassboxError::InvalidInput(format!(
                "{} returned a probability matrix with no class columns",
                model.name()
            )));
        }
        debug!(model = model.name(), rows = x.nrows(), "Pseudo-labels from probabilities");
        return Ok(proba
            .rows()
            .into_iter()
            .map(|row| argmax(row).unwrap_or(0))
            .collect());
    }

    if caps.labels {
        let labels = model.predict_labels(x)?;
        if labels.len() != x.nrows() {
            return Err(GlassboxError::InvalidInput(format!(
                "{} returned {} labels for {} input rows",
                model.name(),
                labels.len(),
                x.nrows()
            )));
        }
        debug!(model = model.name(), rows = x.nrows(), "Pseudo-labels from hard predictions");
        return Ok(labels);
    }

    Err(GlassboxError::UnsupportedModel(format!(
        "{} exposes neither probabilities nor labels",
        model.name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackbox::{Capabilities, LabelFn, ProbabilityFn};
    use ndarray::array;

    struct Both;

    impl BlackBoxModel for Both {
        fn capabilities(&self) -> Capabilities {
            Capabilities::ALL
        }

        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
            Ok(Array2::from_shape_fn((x.nrows(), 2), |(_, j)| j as f64))
        }

        fn predict_labels(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
            Ok(Array1::zeros(x.nrows()))
        }
    }

    struct Mute;

    impl BlackBoxModel for Mute {
        fn capabilities(&self) -> Capabilities {
            Capabilities::NONE
        }
    }

    #[test]
    fn test_argmax_of_probabilities() {
        let model = ProbabilityFn::new(|_x: &Array2<f64>| {
            Ok(array![[0.1, 0.7, 0.2], [0.5, 0.2, 0.3], [0.0, 0.0, 1.0]])
        });
        let labels = generate_pseudo_labels(&Array2::zeros((3, 2)), &model).unwrap();
        assert_eq!(labels, array![1, 0, 2]);
    }

    #[test]
    fn test_ties_pick_lowest_and_skip_nan() {
        let model = ProbabilityFn::new(|_x: &Array2<f64>| {
            Ok(array![[0.5, 0.5], [f64::NAN, 0.2]])
        });
        let labels = generate_pseudo_labels(&Array2::zeros((2, 1)), &model).unwrap();
        assert_eq!(labels, array![0, 1]);
    }

    #[test]
    fn test_probabilities_preferred_over_labels() {
        let labels = generate_pseudo_labels(&Array2::zeros((4, 1)), &Both).unwrap();
        assert!(labels.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_label_only_model() {
        let model = LabelFn::new(|x: &Array2<f64>| Ok(x.column(0).mapv(|v| (v > 0.0) as usize)));
        let x = array![[-1.0], [2.0], [0.0]];
        assert_eq!(generate_pseudo_labels(&x, &model).unwrap(), array![0, 1, 0]);
    }

    #[test]
    fn test_no_capability_is_unsupported() {
        assert!(matches!(
            generate_pseudo_labels(&Array2::zeros((1, 1)), &Mute),
            Err(GlassboxError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_bad_probability_shapes() {
        let short = ProbabilityFn::new(|_x: &Array2<f64>| Ok(Array2::zeros((1, 2))));
        assert!(matches!(
            generate_pseudo_labels(&Array2::zeros((3, 1)), &short),
            Err(GlassboxError::InvalidInput(_))
        ));

        let empty = ProbabilityFn::new(|x: &Array2<f64>| Ok(Array2::zeros((x.nrows(), 0))));
        assert!(matches!(
            generate_pseudo_labels(&Array2::zeros((3, 1)), &empty),
            Err(GlassboxError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_model_errors_propagate() {
        let failing = ProbabilityFn::new(|_x: &Array2<f64>| {
            Err(GlassboxError::ShapeError {
                expected: "5 features".to_string(),
                actual: "1 features".to_string(),
            })
        });
        assert!(matches!(
            generate_pseudo_labels(&Array2::zeros((2, 1)), &failing),
            Err(GlassboxError::ShapeError { .. })
        ));
    }
}

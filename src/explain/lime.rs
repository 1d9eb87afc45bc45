//! LIME tabular explainer with quartile discretization

use super::discretizer::QuartileDiscretizer;
use crate::blackbox::BlackBoxModel;
use crate::config::ExplainConfig;
use crate::data::FeatureMatrix;
use crate::error::{GlassboxError, Result};
use crate::utils::{argmax, weighted_ridge};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Local attribution of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature_index: usize,
    pub feature_name: String,
    /// Bin condition of the explained value, e.g. `feature_0 > 0.41`
    pub condition: String,
    /// Signed coefficient of the local linear model
    pub weight: f64,
}

/// Local explanation for one instance and one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalExplanation {
    /// Class whose probability was explained
    pub label: usize,
    /// Black-box probability of `label` for the instance
    pub model_prediction: f64,
    /// Local linear model evaluated at the instance
    pub local_prediction: f64,
    pub intercept: f64,
    /// Weighted R² of the local fit
    pub score: f64,
    /// One entry per feature, in column order
    pub weights: Vec<FeatureWeight>,
}

impl LocalExplanation {
    /// Weights ordered by absolute value, descending
    pub fn sorted_weights(&self) -> Vec<&FeatureWeight> {
        let mut sorted: Vec<&FeatureWeight> = self.weights.iter().collect();
        sorted.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));
        sorted
    }

    pub fn top_k(&self, k: usize) -> Vec<&FeatureWeight> {
        self.sorted_weights().into_iter().take(k).collect()
    }

    pub fn positive(&self) -> Vec<&FeatureWeight> {
        self.weights.iter().filter(|w| w.weight > 0.0).collect()
    }

    pub fn negative(&self) -> Vec<&FeatureWeight> {
        self.weights.iter().filter(|w| w.weight < 0.0).collect()
    }
}

/// Model-agnostic local explainer over tabular data.
///
/// Perturbations are drawn bin-by-bin from the training distribution, then
/// a kernel-weighted ridge model is fitted on the "same bin as the instance"
/// indicators.
#[derive(Debug, Clone)]
pub struct LimeTabularExplainer {
    discretizer: QuartileDiscretizer,
    feature_names: Vec<String>,
    num_samples: usize,
    kernel_width: f64,
    ridge_alpha: f64,
}

impl LimeTabularExplainer {
    pub fn new(training: &FeatureMatrix, config: &ExplainConfig) -> Result<Self> {
        config.validate()?;
        let discretizer = QuartileDiscretizer::fit(training.values())?;
        let kernel_width = config
            .kernel_width
            .unwrap_or_else(|| 0.75 * (training.n_features() as f64).sqrt());
        Ok(Self {
            discretizer,
            feature_names: training.names().to_vec(),
            num_samples: config.num_samples,
            kernel_width,
            ridge_alpha: config.ridge_alpha,
        })
    }

    pub fn kernel_width(&self) -> f64 {
        self.kernel_width
    }

    fn kernel(&self, distance: f64) -> f64 {
        (-(distance * distance) / (self.kernel_width * self.kernel_width))
            .exp()
            .sqrt()
    }

    /// Perturbed rows and their binary representation; row 0 is the instance
    fn perturb(&self, instance: ArrayView1<'_, f64>, rng: &mut StdRng) -> (Array2<f64>, Array2<f64>) {
        let n_features = self.discretizer.n_features();
        let instance_bins = self.discretizer.discretize(instance);

        let mut data = Array2::<f64>::zeros((self.num_samples, n_features));
        let mut binary = Array2::<f64>::ones((self.num_samples, n_features));
        data.row_mut(0).assign(&instance);

        for i in 1..self.num_samples {
            for (j, &own_bin) in instance_bins.iter().enumerate() {
                let bins = self.discretizer.feature(j);
                let bin = bins.sample_bin(rng);
                data[[i, j]] = bins.sample_value(bin, rng);
                binary[[i, j]] = if bin == own_bin { 1.0 } else { 0.0 };
            }
        }
        (data, binary)
    }

    /// Explain the black box's top class for `instance`
    pub fn explain_instance(
        &self,
        instance: ArrayView1<'_, f64>,
        model: &dyn BlackBoxModel,
        seed: u64,
    ) -> Result<LocalExplanation> {
        if instance.len() != self.discretizer.n_features() {
            return Err(GlassboxError::ShapeError {
                expected: format!("{} features", self.discretizer.n_features()),
                actual: format!("{} features", instance.len()),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let (data, binary) = self.perturb(instance, &mut rng);

        let proba = model.predict_proba(&data)?;
        if proba.nrows() != self.num_samples || proba.ncols() == 0 {
            return Err(GlassboxError::InvalidInput(format!(
                "{} returned a {}x{} probability matrix for {} perturbations",
                model.name(),
                proba.nrows(),
                proba.ncols(),
                self.num_samples
            )));
        }
        let label = argmax(proba.row(0)).unwrap_or(0);

        let weights: Array1<f64> = binary
            .rows()
            .into_iter()
            .map(|row| {
                let mismatches = row.iter().filter(|&&b| b == 0.0).count() as f64;
                self.kernel(mismatches.sqrt())
            })
            .collect();

        let fit = weighted_ridge(binary.view(), proba.column(label), weights.view(), self.ridge_alpha)
            .ok_or_else(|| {
                GlassboxError::ComputationError("local ridge system is singular".to_string())
            })?;

        let instance_bins = self.discretizer.discretize(instance);
        let feature_weights = fit
            .coefficients
            .iter()
            .enumerate()
            .map(|(j, &w)| FeatureWeight {
                feature_index: j,
                feature_name: self.feature_names[j].clone(),
                condition: self
                    .discretizer
                    .feature(j)
                    .describe(instance_bins[j], &self.feature_names[j]),
                weight: w,
            })
            .collect();

        Ok(LocalExplanation {
            label,
            model_prediction: proba[[0, label]],
            local_prediction: fit.intercept + fit.coefficients.sum(),
            intercept: fit.intercept,
            score: fit.score,
            weights: feature_weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackbox::ProbabilityFn;

    fn training() -> FeatureMatrix {
        FeatureMatrix::from_array(Array2::from_shape_fn((80, 3), |(i, j)| {
            ((i * (j + 3)) % 17) as f64 - 8.0
        }))
    }

    fn first_feature_model() -> impl BlackBoxModel {
        ProbabilityFn::new(|x: &Array2<f64>| {
            Ok(Array2::from_shape_fn((x.nrows(), 2), |(i, j)| {
                let p = 1.0 / (1.0 + (-x[[i, 0]]).exp());
                if j == 1 {
                    p
                } else {
                    1.0 - p
                }
            }))
        })
    }

    #[test]
    fn test_dominant_feature_has_largest_weight() {
        let train = training();
        let config = ExplainConfig::default().with_num_samples(1000);
        let explainer = LimeTabularExplainer::new(&train, &config).unwrap();

        let exp = explainer
            .explain_instance(train.row(5), &first_feature_model(), 7)
            .unwrap();
        assert_eq!(exp.weights.len(), 3);
        assert_eq!(exp.top_k(1)[0].feature_index, 0);
        assert_eq!(exp.weights[0].feature_name, "feature_0");
    }

    #[test]
    fn test_same_seed_same_explanation() {
        let train = training();
        let config = ExplainConfig::default().with_num_samples(300);
        let explainer = LimeTabularExplainer::new(&train, &config).unwrap();
        let model = first_feature_model();

        let a = explainer.explain_instance(train.row(2), &model, 11).unwrap();
        let b = explainer.explain_instance(train.row(2), &model, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_kernel_width() {
        let explainer = LimeTabularExplainer::new(&training(), &ExplainConfig::default()).unwrap();
        assert!((explainer.kernel_width() - 0.75 * 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_instance_width() {
        let explainer = LimeTabularExplainer::new(&training(), &ExplainConfig::default()).unwrap();
        let row = ndarray::array![1.0, 2.0];
        assert!(matches!(
            explainer.explain_instance(row.view(), &first_feature_model(), 0),
            Err(GlassboxError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_positive_and_negative_partition() {
        let train = training();
        let config = ExplainConfig::default().with_num_samples(500);
        let explainer = LimeTabularExplainer::new(&train, &config).unwrap();
        let exp = explainer
            .explain_instance(train.row(9), &first_feature_model(), 1)
            .unwrap();
        let nonzero = exp.weights.iter().filter(|w| w.weight != 0.0).count();
        assert_eq!(exp.positive().len() + exp.negative().len(), nonzero);
    }
}

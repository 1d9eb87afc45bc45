//! Global importance from aggregated local explanations

use crate::blackbox::BlackBoxModel;
use crate::config::ExplainConfig;
use crate::data::FeatureMatrix;
use crate::error::{GlassboxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Why a ranking came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegradedReason {
    /// The black box does not expose class probabilities
    NoProbabilities,
    /// Built without the `lime` feature
    ExplainerUnavailable,
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradedReason::NoProbabilities => write!(f, "model exposes no class probabilities"),
            DegradedReason::ExplainerUnavailable => write!(f, "local explainer not compiled in"),
        }
    }
}

/// Features ranked by mean absolute local attribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalImportance {
    /// `(feature name, score)` by descending score; ties keep column order
    pub ranking: Vec<(String, f64)>,
    /// Rows actually explained
    pub n_sampled: usize,
    /// Set when the ranking is empty by design rather than by input
    pub degraded: Option<DegradedReason>,
}

impl GlobalImportance {
    fn degraded(reason: DegradedReason) -> Self {
        warn!(reason = %reason, "Global importance unavailable; returning empty ranking");
        Self {
            ranking: Vec::new(),
            n_sampled: 0,
            degraded: Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranking.len()
    }

    /// Score of a feature by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.ranking.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    pub fn top(&self, k: usize) -> &[(String, f64)] {
        &self.ranking[..k.min(self.ranking.len())]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ranking.iter().map(|(n, _)| n.as_str())
    }
}

/// Rank the features of `x` by how strongly they drive `model` locally.
///
/// `sample_count` rows (clamped to the row count) are explained with LIME
/// on the black box's top class; the absolute weights are averaged over
/// the rows actually explained. A model without probabilities, or a build
/// without the `lime` feature, yields an empty degraded ranking.
pub fn compute_global_importance(
    x: &FeatureMatrix,
    model: &dyn BlackBoxModel,
    sample_count: usize,
    config: &ExplainConfig,
) -> Result<GlobalImportance> {
    config.validate()?;
    if !model.capabilities().probabilities {
        return Ok(GlobalImportance::degraded(DegradedReason::NoProbabilities));
    }
    if !cfg!(feature = "lime") {
        return Ok(GlobalImportance::degraded(DegradedReason::ExplainerUnavailable));
    }
    if x.is_empty() {
        return Err(GlassboxError::InvalidInput(
            "feature matrix has no rows or no columns".to_string(),
        ));
    }
    if sample_count == 0 {
        return Err(GlassboxError::invalid_parameter(
            "sample_count",
            0,
            "must be at least 1",
        ));
    }

    let k = sample_count.min(x.n_rows());
    let scores = aggregate(x, model, k, config)?;

    let mut ranking: Vec<(String, f64)> = x.names().iter().cloned().zip(scores).collect();
    // Stable sort keeps column order among equal scores
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

    info!(
        model = model.name(),
        sampled = k,
        features = ranking.len(),
        "Global importance computed"
    );
    Ok(GlobalImportance {
        ranking,
        n_sampled: k,
        degraded: None,
    })
}

#[cfg(feature = "lime")]
fn aggregate(
    x: &FeatureMatrix,
    model: &dyn BlackBoxModel,
    k: usize,
    config: &ExplainConfig,
) -> Result<Vec<f64>> {
    use super::LimeTabularExplainer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rayon::prelude::*;

    let explainer = LimeTabularExplainer::new(x, config)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut rows = rand::seq::index::sample(&mut rng, x.n_rows(), k).into_vec();
    rows.sort_unstable();

    let explanations = rows
        .par_iter()
        .map(|&i| explainer.explain_instance(x.row(i), model, config.seed.wrapping_add(i as u64)))
        .collect::<Result<Vec<_>>>()?;

    let mut totals = vec![0.0; x.n_features()];
    for exp in &explanations {
        for fw in &exp.weights {
            totals[fw.feature_index] += fw.weight.abs();
        }
    }
    let n = explanations.len().max(1) as f64;
    Ok(totals.into_iter().map(|t| t / n).collect())
}

#[cfg(not(feature = "lime"))]
fn aggregate(
    _x: &FeatureMatrix,
    _model: &dyn BlackBoxModel,
    _k: usize,
    _config: &ExplainConfig,
) -> Result<Vec<f64>> {
    Err(GlassboxError::ComputationError(
        "local explainer not compiled in".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackbox::LabelFn;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_label_only_model_degrades() {
        let x = FeatureMatrix::from_array(Array2::zeros((5, 2)));
        let model = LabelFn::new(|x: &Array2<f64>| Ok(Array1::zeros(x.nrows())));
        let result = compute_global_importance(&x, &model, 3, &ExplainConfig::default()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.degraded, Some(DegradedReason::NoProbabilities));
    }

    #[test]
    fn test_ranking_helpers() {
        let imp = GlobalImportance {
            ranking: vec![("b".to_string(), 0.5), ("a".to_string(), 0.2)],
            n_sampled: 4,
            degraded: None,
        };
        assert_eq!(imp.get("a"), Some(0.2));
        assert_eq!(imp.top(1)[0].0, "b");
        assert_eq!(imp.top(10).len(), 2);
        assert_eq!(imp.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(!imp.is_degraded());
    }

    #[cfg(not(feature = "lime"))]
    #[test]
    fn test_without_explainer_degrades() {
        let x = FeatureMatrix::from_array(Array2::zeros((5, 2)));
        let model = crate::blackbox::ProbabilityFn::new(|x: &Array2<f64>| {
            Ok(Array2::from_elem((x.nrows(), 2), 0.5))
        });
        let result = compute_global_importance(&x, &model, 3, &ExplainConfig::default()).unwrap();
        assert_eq!(result.degraded, Some(DegradedReason::ExplainerUnavailable));
    }
}

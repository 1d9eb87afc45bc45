//! One-shot distillation pipeline and its report

use super::{evaluate_accuracy, evaluate_fidelity, FidelityLevel};
use crate::blackbox::{BlackBoxModel, Capabilities};
use crate::config::DistillConfig;
use crate::data::FeatureMatrix;
use crate::error::Result;
use crate::explain::{compute_global_importance, GlobalImportance};
use crate::labels::generate_pseudo_labels;
use crate::surrogate::{train_surrogate, Classifier, SurrogateModel, SurrogateStrategy, TreeRenderOptions};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// What the black box predicts on the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherSummary {
    pub model_name: String,
    pub capabilities: Capabilities,
    pub n_rows: usize,
    pub n_features: usize,
    /// `(class, count)` for every predicted class, ascending by class
    pub class_counts: Vec<(usize, usize)>,
    /// First predictions, in row order
    pub preview: Vec<usize>,
}

impl TeacherSummary {
    fn from_labels(model: &dyn BlackBoxModel, x: &FeatureMatrix, labels: &Array1<usize>, preview: usize) -> Self {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for &c in labels {
            *counts.entry(c).or_insert(0) += 1;
        }
        Self {
            model_name: model.name().to_string(),
            capabilities: model.capabilities(),
            n_rows: x.n_rows(),
            n_features: x.n_features(),
            class_counts: counts.into_iter().collect(),
            preview: labels.iter().take(preview).copied().collect(),
        }
    }

    pub fn n_classes(&self) -> usize {
        self.class_counts.len()
    }
}

/// Outcome of one surrogate strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy: SurrogateStrategy,
    /// False when the strategy was compiled out
    pub available: bool,
    pub fidelity: f64,
    pub level: Option<FidelityLevel>,
    /// Accuracy against ground truth, when labels were supplied
    pub accuracy: Option<f64>,
    pub fit_ms: u64,
    pub description: Option<String>,
    #[serde(skip)]
    surrogate: Option<SurrogateModel>,
}

impl StrategyReport {
    pub fn surrogate(&self) -> Option<&SurrogateModel> {
        self.surrogate.as_ref()
    }
}

/// Everything one distillation run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistillationReport {
    pub feature_names: Vec<String>,
    pub teacher: TeacherSummary,
    pub strategies: Vec<StrategyReport>,
    pub importance: Option<GlobalImportance>,
}

impl DistillationReport {
    /// Available strategy with the highest fidelity; ties keep the earlier one
    pub fn best(&self) -> Option<&StrategyReport> {
        self.strategies
            .iter()
            .filter(|s| s.available)
            .fold(None, |best: Option<&StrategyReport>, s| match best {
                Some(b) if b.fidelity >= s.fidelity => Some(b),
                _ => Some(s),
            })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Runs labeling, surrogate training, evaluation and optionally the global
/// importance ranking in one call
#[derive(Debug, Clone)]
pub struct Distiller {
    config: DistillConfig,
    importance_samples: Option<usize>,
    render: TreeRenderOptions,
    preview_len: usize,
}

impl Default for Distiller {
    fn default() -> Self {
        Self::new(DistillConfig::default())
    }
}

impl Distiller {
    pub fn new(config: DistillConfig) -> Self {
        Self {
            config,
            importance_samples: None,
            render: TreeRenderOptions::default(),
            preview_len: 5,
        }
    }

    /// Also compute the global importance over `samples` rows
    pub fn with_importance(mut self, samples: usize) -> Self {
        self.importance_samples = Some(samples);
        self
    }

    pub fn with_render_options(mut self, render: TreeRenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_preview_len(mut self, n: usize) -> Self {
        self.preview_len = n;
        self
    }

    pub fn config(&self) -> &DistillConfig {
        &self.config
    }

    pub fn run(
        &self,
        x: &FeatureMatrix,
        model: &dyn BlackBoxModel,
        strategies: &[SurrogateStrategy],
        y_true: Option<&Array1<usize>>,
    ) -> Result<DistillationReport> {
        self.config.validate()?;
        let labels = generate_pseudo_labels(x.values(), model)?;
        let teacher = TeacherSummary::from_labels(model, x, &labels, self.preview_len);
        info!(
            model = %teacher.model_name,
            rows = teacher.n_rows,
            classes = teacher.n_classes(),
            "Black-box predictions collected"
        );

        let mut reports = Vec::with_capacity(strategies.len());
        for &strategy in strategies {
            reports.push(self.run_strategy(strategy, x, model, y_true)?);
        }

        let importance = match self.importance_samples {
            Some(samples) => Some(compute_global_importance(x, model, samples, &self.config.explain)?),
            None => None,
        };

        Ok(DistillationReport {
            feature_names: x.names().to_vec(),
            teacher,
            strategies: reports,
            importance,
        })
    }

    fn run_strategy(
        &self,
        strategy: SurrogateStrategy,
        x: &FeatureMatrix,
        model: &dyn BlackBoxModel,
        y_true: Option<&Array1<usize>>,
    ) -> Result<StrategyReport> {
        let start = Instant::now();
        let surrogate = train_surrogate(strategy, x, model, &self.config)?;
        let fit_ms = start.elapsed().as_millis() as u64;

        let candidate = surrogate.as_ref().map(|s| s as &dyn Classifier);
        let fidelity = evaluate_fidelity(candidate, Some(model), x.values())?;
        let accuracy = match y_true {
            Some(y) => Some(evaluate_accuracy(candidate, x.values(), y)?),
            None => None,
        };
        let description = match &surrogate {
            Some(s) => Some(s.describe(x.names(), self.render)?),
            None => None,
        };

        let level = surrogate.as_ref().map(|_| FidelityLevel::from_score(fidelity));
        if level == Some(FidelityLevel::Low) {
            warn!(strategy = %strategy, fidelity, "Surrogate fidelity is low");
        }

        Ok(StrategyReport {
            strategy,
            available: surrogate.is_some(),
            fidelity,
            level,
            accuracy,
            fit_ms,
            description,
            surrogate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackbox::LabelFn;
    use ndarray::Array2;

    fn data() -> FeatureMatrix {
        FeatureMatrix::from_array(Array2::from_shape_fn((40, 2), |(i, j)| {
            if j == 0 {
                i as f64 - 19.5
            } else {
                (i % 5) as f64
            }
        }))
    }

    #[test]
    fn test_report_for_tree() {
        let x = data();
        let model = LabelFn::new(|x: &Array2<f64>| Ok(x.column(0).mapv(|v| (v > 0.0) as usize)));
        let y = model.predict_labels(x.values()).unwrap();

        let report = Distiller::default()
            .run(&x, &model, &[SurrogateStrategy::DecisionTree { max_depth: 1 }], Some(&y))
            .unwrap();

        assert_eq!(report.teacher.class_counts, vec![(0, 20), (1, 20)]);
        assert_eq!(report.teacher.preview, vec![0, 0, 0, 0, 0]);
        let tree = &report.strategies[0];
        assert!(tree.available);
        assert_eq!(tree.fidelity, 1.0);
        assert_eq!(tree.accuracy, Some(1.0));
        assert_eq!(tree.level, Some(FidelityLevel::Excellent));
        assert!(tree.surrogate().is_some());
        assert!(report.importance.is_none());
        assert_eq!(report.best().map(|s| s.strategy), Some(tree.strategy));
    }

    #[test]
    fn test_report_serializes_without_models() {
        let x = data();
        let model = LabelFn::new(|x: &Array2<f64>| Ok(x.column(0).mapv(|v| (v > 0.0) as usize)));
        let report = Distiller::default()
            .with_importance(5)
            .run(&x, &model, &[SurrogateStrategy::tree()], None)
            .unwrap();

        let json = report.to_json_pretty().unwrap();
        assert!(json.contains("\"fidelity\""));
        assert!(!json.contains("\"surrogate\""));
        // Label-only black box: ranking degrades instead of failing
        assert!(report.importance.as_ref().is_some_and(|imp| imp.is_degraded()));
    }
}

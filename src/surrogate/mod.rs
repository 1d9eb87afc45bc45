//! Interpretable surrogate models and the strategies that train them
//!
//! Every strategy fits on `(x, pseudo_labels)` where the pseudo-labels come
//! from the black box, so a surrogate learns to imitate the black box rather
//! than the ground truth.

mod decision_tree;
mod logistic;
#[cfg(feature = "risk-score")]
mod risk_score;

pub use decision_tree::{Criterion, DecisionTree, TreeNode, TreeRenderOptions};
pub use logistic::{BinaryLogit, LogisticRegression};
#[cfg(feature = "risk-score")]
pub use risk_score::{RiskScoreModel, ScoreCard};

use crate::blackbox::{BlackBoxModel, RandomForest};
use crate::config::{DistillConfig, MAX_DEPTH_RANGE};
use crate::data::FeatureMatrix;
use crate::error::{GlassboxError, Result};
use crate::labels::generate_pseudo_labels;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Anything that maps a feature matrix to one class index per row
pub trait Classifier: Send + Sync {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;
}

impl Classifier for DecisionTree {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        DecisionTree::predict(self, x)
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        LogisticRegression::predict(self, x)
    }
}

#[cfg(feature = "risk-score")]
impl Classifier for RiskScoreModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        RiskScoreModel::predict(self, x)
    }
}

impl Classifier for RandomForest {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        RandomForest::predict(self, x)
    }
}

/// Which interpretable model family to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum SurrogateStrategy {
    /// One-vs-rest L2 logistic regression
    Logistic,
    /// Shallow CART tree
    DecisionTree { max_depth: usize },
    /// Sparse integer score card
    RiskScore,
}

impl SurrogateStrategy {
    /// Depth-3 tree
    pub fn tree() -> Self {
        SurrogateStrategy::DecisionTree { max_depth: 3 }
    }

    /// All strategies in reporting order
    pub fn all(max_depth: usize) -> Vec<Self> {
        vec![
            SurrogateStrategy::Logistic,
            SurrogateStrategy::DecisionTree { max_depth },
            SurrogateStrategy::RiskScore,
        ]
    }

    /// False when the strategy was compiled out
    pub fn is_available(&self) -> bool {
        match self {
            SurrogateStrategy::RiskScore => cfg!(feature = "risk-score"),
            _ => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SurrogateStrategy::Logistic => "logistic",
            SurrogateStrategy::DecisionTree { .. } => "tree",
            SurrogateStrategy::RiskScore => "risk-score",
        }
    }
}

impl fmt::Display for SurrogateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurrogateStrategy::DecisionTree { max_depth } => write!(f, "tree(depth={})", max_depth),
            other => write!(f, "{}", other.label()),
        }
    }
}

impl FromStr for SurrogateStrategy {
    type Err = GlassboxError;

    /// Accepts `logistic`, `tree`, `tree:<depth>` and `risk-score`
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "logistic" | "logreg" => Ok(SurrogateStrategy::Logistic),
            "tree" | "decision-tree" => Ok(SurrogateStrategy::tree()),
            "risk-score" | "riskscore" | "slim" => Ok(SurrogateStrategy::RiskScore),
            other => {
                if let Some(depth) = other.strip_prefix("tree:") {
                    let max_depth = depth.parse::<usize>().map_err(|_| {
                        GlassboxError::invalid_parameter("max_depth", depth, "not an integer")
                    })?;
                    return Ok(SurrogateStrategy::DecisionTree { max_depth });
                }
                Err(GlassboxError::invalid_parameter(
                    "strategy",
                    other,
                    "expected logistic, tree, tree:<depth> or risk-score",
                ))
            }
        }
    }
}

/// A fitted interpretable surrogate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "kebab-case")]
pub enum SurrogateModel {
    Logistic(LogisticRegression),
    DecisionTree(DecisionTree),
    #[cfg(feature = "risk-score")]
    RiskScore(RiskScoreModel),
}

impl SurrogateModel {
    pub fn kind(&self) -> &'static str {
        match self {
            SurrogateModel::Logistic(_) => "logistic",
            SurrogateModel::DecisionTree(_) => "tree",
            #[cfg(feature = "risk-score")]
            SurrogateModel::RiskScore(_) => "risk-score",
        }
    }

    pub fn as_tree(&self) -> Option<&DecisionTree> {
        match self {
            SurrogateModel::DecisionTree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Human-readable rules, coefficients or score card
    pub fn describe(&self, feature_names: &[String], options: TreeRenderOptions) -> Result<String> {
        match self {
            SurrogateModel::Logistic(model) => Ok(model.describe(feature_names)),
            SurrogateModel::DecisionTree(tree) => {
                let class_names: Vec<String> =
                    (0..tree.n_classes()).map(|c| c.to_string()).collect();
                tree.export_text(feature_names, &class_names, options)
            }
            #[cfg(feature = "risk-score")]
            SurrogateModel::RiskScore(model) => Ok(model.describe(feature_names)),
        }
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Classifier for SurrogateModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        match self {
            SurrogateModel::Logistic(model) => model.predict(x),
            SurrogateModel::DecisionTree(tree) => tree.predict(x),
            #[cfg(feature = "risk-score")]
            SurrogateModel::RiskScore(model) => model.predict(x),
        }
    }
}

/// Fit `strategy` on the black box's pseudo-labels for `x`.
///
/// Returns `Ok(None)` when the strategy was compiled out; that is a valid
/// outcome, and evaluating a `None` surrogate yields zero scores.
pub fn train_surrogate(
    strategy: SurrogateStrategy,
    x: &FeatureMatrix,
    model: &dyn BlackBoxModel,
    config: &DistillConfig,
) -> Result<Option<SurrogateModel>> {
    config.validate()?;
    if let SurrogateStrategy::DecisionTree { max_depth } = strategy {
        if !MAX_DEPTH_RANGE.contains(&max_depth) {
            return Err(GlassboxError::invalid_parameter(
                "max_depth",
                max_depth,
                format!(
                    "must be in {}..={}",
                    MAX_DEPTH_RANGE.start(),
                    MAX_DEPTH_RANGE.end()
                ),
            ));
        }
    }
    if !strategy.is_available() {
        warn!(strategy = %strategy, "Surrogate strategy not compiled in; skipping");
        return Ok(None);
    }
    if x.is_empty() {
        return Err(GlassboxError::InvalidInput(
            "feature matrix has no rows or no columns".to_string(),
        ));
    }

    let values = x.values();
    let labels = generate_pseudo_labels(values, model)?;
    let start = Instant::now();

    let fitted = match strategy {
        SurrogateStrategy::Logistic => {
            let mut lr = LogisticRegression::new()
                .with_alpha(config.logistic.alpha)
                .with_learning_rate(config.logistic.learning_rate)
                .with_max_iter(config.logistic.max_iter)
                .with_tol(config.logistic.tol);
            lr.fit(values, &labels)?;
            SurrogateModel::Logistic(lr)
        }
        SurrogateStrategy::DecisionTree { max_depth } => {
            let mut tree = DecisionTree::new()
                .with_max_depth(max_depth)
                .with_criterion(config.tree.criterion)
                .with_min_samples_split(config.tree.min_samples_split)
                .with_min_samples_leaf(config.tree.min_samples_leaf)
                .with_max_features(config.tree.max_features)
                .with_random_state(config.seed);
            tree.fit(values, &labels)?;
            debug!(depth = tree.depth(), leaves = tree.n_leaves(), "Tree surrogate grown");
            SurrogateModel::DecisionTree(tree)
        }
        SurrogateStrategy::RiskScore => fit_risk_score(values, &labels, config)?,
    };

    info!(
        strategy = %strategy,
        model = model.name(),
        rows = x.n_rows(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Surrogate trained"
    );
    Ok(Some(fitted))
}

#[cfg(feature = "risk-score")]
fn fit_risk_score(
    values: &Array2<f64>,
    labels: &Array1<usize>,
    config: &DistillConfig,
) -> Result<SurrogateModel> {
    let mut model = RiskScoreModel::new()
        .with_l1_penalty(config.risk_score.l1_penalty)
        .with_max_coefficient(config.risk_score.max_coefficient)
        .with_learning_rate(config.risk_score.learning_rate)
        .with_max_iter(config.risk_score.max_iter)
        .with_tol(config.risk_score.tol);
    model.fit(values, labels)?;
    debug!(nonzero = model.n_nonzero(), "Risk score fitted");
    Ok(SurrogateModel::RiskScore(model))
}

#[cfg(not(feature = "risk-score"))]
fn fit_risk_score(
    _values: &Array2<f64>,
    _labels: &Array1<usize>,
    _config: &DistillConfig,
) -> Result<SurrogateModel> {
    Err(GlassboxError::TrainingError(
        "risk-score support is not compiled in".to_string(),
    ))
}

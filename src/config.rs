//! Distillation configuration
//!
//! Every stochastic step in the pipeline reads its seed from here; nothing
//! touches process-wide random state.

use crate::error::{GlassboxError, Result};
use crate::surrogate::{Criterion, SurrogateStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Valid depth range for tree surrogates
pub const MAX_DEPTH_RANGE: std::ops::RangeInclusive<usize> = 1..=15;

/// Decision-tree surrogate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Depth of the tree built by [`DistillConfig::tree_strategy`] and
    /// [`DistillConfig::strategies`]
    pub max_depth: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Number of candidate features per node (all when `None`)
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            criterion: Criterion::Gini,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Logistic-regression surrogate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// L2 regularization strength
    pub alpha: f64,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Maximum gradient descent iterations per binary problem
    pub max_iter: usize,
    /// Gradient-norm convergence tolerance
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            learning_rate: 0.5,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Sparse integer risk-score surrogate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskScoreConfig {
    /// L1 penalty driving coefficients to zero
    pub l1_penalty: f64,
    /// Largest absolute integer weight on the score card
    pub max_coefficient: i64,
    /// Proximal gradient step size
    pub learning_rate: f64,
    /// Maximum proximal gradient iterations
    pub max_iter: usize,
    /// Convergence tolerance on coefficient change
    pub tol: f64,
}

impl Default for RiskScoreConfig {
    fn default() -> Self {
        Self {
            l1_penalty: 0.01,
            max_coefficient: 5,
            learning_rate: 0.5,
            max_iter: 2000,
            tol: 1e-7,
        }
    }
}

/// Global explanation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// Seed for row sampling and perturbation
    pub seed: u64,
    /// Number of rows to explain (clamped to the row count)
    pub sample_count: usize,
    /// Perturbations drawn per explained row
    pub num_samples: usize,
    /// Exponential kernel width; `0.75 * sqrt(n_features)` when unset
    pub kernel_width: Option<f64>,
    /// Ridge penalty of the local linear model
    pub ridge_alpha: f64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            sample_count: 100,
            num_samples: 5000,
            kernel_width: None,
            ridge_alpha: 1.0,
        }
    }
}

impl ExplainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sample_count(mut self, n: usize) -> Self {
        self.sample_count = n;
        self
    }

    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    pub fn with_kernel_width(mut self, width: f64) -> Self {
        self.kernel_width = Some(width);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_samples < 2 {
            return Err(GlassboxError::invalid_parameter(
                "num_samples",
                self.num_samples,
                "need at least 2 perturbations",
            ));
        }
        if let Some(w) = self.kernel_width {
            if !(w > 0.0) {
                return Err(GlassboxError::invalid_parameter(
                    "kernel_width",
                    w,
                    "must be positive",
                ));
            }
        }
        if self.ridge_alpha < 0.0 {
            return Err(GlassboxError::invalid_parameter(
                "ridge_alpha",
                self.ridge_alpha,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for a distillation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistillConfig {
    /// Seed for surrogate fitting
    pub seed: u64,
    pub tree: TreeConfig,
    pub logistic: LogisticConfig,
    pub risk_score: RiskScoreConfig,
    pub explain: ExplainConfig,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            tree: TreeConfig::default(),
            logistic: LogisticConfig::default(),
            risk_score: RiskScoreConfig::default(),
            explain: ExplainConfig::default(),
        }
    }
}

impl DistillConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the fitting seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the surrogate tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.tree.max_depth = depth;
        self
    }

    /// Tree strategy at the configured depth
    pub fn tree_strategy(&self) -> SurrogateStrategy {
        SurrogateStrategy::DecisionTree {
            max_depth: self.tree.max_depth,
        }
    }

    /// Every strategy, the tree at the configured depth
    pub fn strategies(&self) -> Vec<SurrogateStrategy> {
        SurrogateStrategy::all(self.tree.max_depth)
    }

    /// Builder method to set the tree impurity criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.tree.criterion = criterion;
        self
    }

    /// Builder method to replace the explanation settings
    pub fn with_explain(mut self, explain: ExplainConfig) -> Self {
        self.explain = explain;
        self
    }

    /// Check every section for out-of-range values
    pub fn validate(&self) -> Result<()> {
        if !MAX_DEPTH_RANGE.contains(&self.tree.max_depth) {
            return Err(GlassboxError::invalid_parameter(
                "max_depth",
                self.tree.max_depth,
                format!(
                    "must be in {}..={}",
                    MAX_DEPTH_RANGE.start(),
                    MAX_DEPTH_RANGE.end()
                ),
            ));
        }
        if self.tree.min_samples_split < 2 {
            return Err(GlassboxError::invalid_parameter(
                "min_samples_split",
                self.tree.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.tree.min_samples_leaf == 0 {
            return Err(GlassboxError::invalid_parameter(
                "min_samples_leaf",
                0,
                "must be at least 1",
            ));
        }
        if self.tree.max_features == Some(0) {
            return Err(GlassboxError::invalid_parameter(
                "max_features",
                0,
                "must be at least 1",
            ));
        }
        if !(self.logistic.learning_rate > 0.0) {
            return Err(GlassboxError::invalid_parameter(
                "logistic.learning_rate",
                self.logistic.learning_rate,
                "must be positive",
            ));
        }
        if self.logistic.alpha < 0.0 {
            return Err(GlassboxError::invalid_parameter(
                "logistic.alpha",
                self.logistic.alpha,
                "must be non-negative",
            ));
        }
        if !(self.risk_score.learning_rate > 0.0) {
            return Err(GlassboxError::invalid_parameter(
                "risk_score.learning_rate",
                self.risk_score.learning_rate,
                "must be positive",
            ));
        }
        if self.risk_score.l1_penalty < 0.0 {
            return Err(GlassboxError::invalid_parameter(
                "risk_score.l1_penalty",
                self.risk_score.l1_penalty,
                "must be non-negative",
            ));
        }
        if self.risk_score.max_coefficient < 1 {
            return Err(GlassboxError::invalid_parameter(
                "risk_score.max_coefficient",
                self.risk_score.max_coefficient,
                "must be at least 1",
            ));
        }
        self.explain.validate()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            GlassboxError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

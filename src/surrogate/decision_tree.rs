//! Shallow CART classification tree used as a rule-based surrogate

use crate::error::{GlassboxError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the class distribution of its training rows
    Leaf {
        counts: Vec<usize>,
        n_samples: usize,
        impurity: f64,
    },
    /// Internal node: rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        counts: Vec<usize>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    pub fn counts(&self) -> &[usize] {
        match self {
            TreeNode::Leaf { counts, .. } | TreeNode::Split { counts, .. } => counts,
        }
    }

    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    pub fn impurity(&self) -> f64 {
        match self {
            TreeNode::Leaf { impurity, .. } | TreeNode::Split { impurity, .. } => *impurity,
        }
    }

    /// Majority class; ties go to the lowest class index
    pub fn majority_class(&self) -> usize {
        majority(self.counts())
    }
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    fn impurity(self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }
}

impl FromStr for Criterion {
    type Err = GlassboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            other => Err(GlassboxError::invalid_parameter(
                "criterion",
                other,
                "expected 'gini' or 'entropy'",
            )),
        }
    }
}

fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = class;
        }
    }
    best
}

/// Options for [`DecisionTree::export_text`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRenderOptions {
    /// Append the node impurity
    pub show_impurity: bool,
    /// Show class proportions and sample share instead of raw counts
    pub show_proportion: bool,
}

/// Decision tree classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (number of split levels)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Candidate features drawn per node (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature subsampling
    pub random_state: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create an unbounded classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: crate::config::DEFAULT_SEED,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set the number of candidate features per node
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the feature subsampling seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit on class indices; the class count is `max(y) + 1`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<&mut Self> {
        let n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
        self.fit_with_classes(x, y, n_classes)
    }

    /// Fit with an explicit class count, so that every tree of an ensemble
    /// reports distributions of the same width
    pub fn fit_with_classes(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        n_classes: usize,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(GlassboxError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(GlassboxError::InvalidInput(format!(
                "cannot fit a tree on a {}x{} matrix",
                n_samples, n_features
            )));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(GlassboxError::InvalidInput(format!(
                "label {} outside {} classes",
                bad, n_classes
            )));
        }

        self.n_features = n_features;
        self.n_classes = n_classes;

        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn class_counts(&self, y: &Array1<usize>, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let impurity = self.criterion.impurity(&counts, n_samples);

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;

        if should_stop {
            return TreeNode::Leaf {
                counts,
                n_samples,
                impurity,
            };
        }

        let candidates = self.candidate_features(rng);
        let Some((feature_idx, threshold, gain)) =
            self.find_best_split(x, y, indices, &candidates, impurity)
        else {
            return TreeNode::Leaf {
                counts,
                n_samples,
                impurity,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            counts,
            n_samples,
            impurity,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(m) if m < self.n_features => {
                let mut picked = sample(rng, self.n_features, m.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best (feature, threshold, impurity decrease) over the candidate features.
    /// Equal gains resolve to the lower feature index.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        indices: &[usize],
        candidates: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let total_counts = self.class_counts(y, indices);

        let feature_results: Vec<Option<(usize, f64, f64)>> = candidates
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<(f64, usize)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], y[i]))
                    .collect();
                order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut left_counts = vec![0usize; self.n_classes];
                let mut right_counts = total_counts.clone();
                let mut best: Option<(f64, f64)> = None;

                // Sweep split positions between consecutive distinct values
                for pos in 0..n - 1 {
                    let (value, class) = order[pos];
                    left_counts[class] += 1;
                    right_counts[class] -= 1;

                    let next_value = order[pos + 1].0;
                    if next_value <= value {
                        continue;
                    }
                    let left_n = pos + 1;
                    let right_n = n - left_n;
                    if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left_n as f64 * self.criterion.impurity(&left_counts, left_n)
                        + right_n as f64 * self.criterion.impurity(&right_counts, right_n))
                        / n as f64;
                    let gain = parent_impurity - weighted;
                    if best.map_or(true, |(g, _)| gain > g) {
                        // Midpoint of adjacent floats can round up to next_value
                        let mut threshold = value + (next_value - value) / 2.0;
                        if threshold >= next_value {
                            threshold = value;
                        }
                        best = Some((gain, threshold));
                    }
                }

                best.filter(|(gain, _)| *gain > 1e-12)
                    .map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(best) if best.2 >= cand.2 => Some(best),
                _ => Some(cand),
            })
    }

    fn root(&self) -> Result<&TreeNode> {
        self.root.as_ref().ok_or(GlassboxError::ModelNotFitted)
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(GlassboxError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    fn leaf_for<'a>(&self, mut node: &'a TreeNode, sample: ArrayView1<'_, f64>) -> &'a TreeNode {
        loop {
            match node {
                TreeNode::Leaf { .. } => return node,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let root = self.root()?;
        self.check_width(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| self.leaf_for(root, row).majority_class())
            .collect())
    }

    /// Leaf class frequencies, shape `(n_rows, n_classes)`
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root()?;
        self.check_width(x)?;
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let leaf = self.leaf_for(root, row);
            let n = leaf.n_samples().max(1) as f64;
            for (j, &c) in leaf.counts().iter().enumerate() {
                proba[[i, j]] = c as f64 / n;
            }
        }
        Ok(proba)
    }

    /// Normalized impurity-decrease importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Number of split levels (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn root_node(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Render the tree as indented decision rules.
    ///
    /// Missing feature or class names fall back to `x[i]` and the class index.
    pub fn export_text(
        &self,
        feature_names: &[String],
        class_names: &[String],
        options: TreeRenderOptions,
    ) -> Result<String> {
        let root = self.root()?;
        let mut out = String::new();
        self.render_node(root, 0, root.n_samples(), feature_names, class_names, options, &mut out);
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_node(
        &self,
        node: &TreeNode,
        depth: usize,
        total: usize,
        feature_names: &[String],
        class_names: &[String],
        options: TreeRenderOptions,
        out: &mut String,
    ) {
        let indent = "|   ".repeat(depth);
        let class = node.majority_class();
        let class_name = class_names
            .get(class)
            .cloned()
            .unwrap_or_else(|| class.to_string());

        let samples = if options.show_proportion {
            format!("{:.1}%", 100.0 * node.n_samples() as f64 / total.max(1) as f64)
        } else {
            node.n_samples().to_string()
        };
        let value = if options.show_proportion {
            let n = node.n_samples().max(1) as f64;
            let parts: Vec<String> = node
                .counts()
                .iter()
                .map(|&c| format!("{:.2}", c as f64 / n))
                .collect();
            format!("[{}]", parts.join(", "))
        } else {
            format!("{:?}", node.counts())
        };
        let mut summary = format!("samples = {}, value = {}, class = {}", samples, value, class_name);
        if options.show_impurity {
            let _ = write!(summary, ", {} = {:.4}", self.criterion.label(), node.impurity());
        }

        match node {
            TreeNode::Leaf { .. } => {
                let _ = writeln!(out, "{}|--- leaf: {}", indent, summary);
            }
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                let feature = feature_names
                    .get(*feature_idx)
                    .cloned()
                    .unwrap_or_else(|| format!("x[{}]", feature_idx));
                let _ = writeln!(out, "{}|--- node: {}", indent, summary);
                let _ = writeln!(out, "{}|--- {} <= {:.4}", indent, feature, threshold);
                self.render_node(left, depth + 1, total, feature_names, class_names, options, out);
                let _ = writeln!(out, "{}|--- {} >  {:.4}", indent, feature, threshold);
                self.render_node(right, depth + 1, total, feature_names, class_names, options, out);
            }
        }
    }
}

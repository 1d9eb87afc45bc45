//! Sparse integer risk-score surrogate
//!
//! A SLIM-style scoring rule: an L1-penalized logistic fit whose
//! coefficients are rescaled and rounded to small integers. Features are
//! z-scored before scoring, so each point is "per standard deviation above
//! the training mean".

use crate::error::{GlassboxError, Result};
use crate::utils::Standardizer;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

/// Integer scoring rule for one binary problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Class scored as positive
    pub positive: usize,
    /// Integer points per standardized feature
    pub weights: Vec<i64>,
    /// Integer offset
    pub intercept: i64,
}

impl ScoreCard {
    fn score(&self, z: ndarray::ArrayView1<'_, f64>) -> f64 {
        self.intercept as f64
            + self
                .weights
                .iter()
                .zip(z.iter())
                .map(|(&w, &v)| w as f64 * v)
                .sum::<f64>()
    }

    /// Features with a nonzero weight
    pub fn support(&self) -> Vec<usize> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w != 0)
            .map(|(j, _)| j)
            .collect()
    }
}

fn soft_threshold(val: f64, threshold: f64) -> f64 {
    if val > threshold {
        val - threshold
    } else if val < -threshold {
        val + threshold
    } else {
        0.0
    }
}

/// Sparse integer-weighted linear classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScoreModel {
    /// L1 penalty
    pub l1_penalty: f64,
    /// Largest absolute integer weight
    pub max_coefficient: i64,
    /// Proximal gradient step size
    pub learning_rate: f64,
    /// Maximum proximal gradient iterations
    pub max_iter: usize,
    /// Convergence tolerance on coefficient change
    pub tol: f64,
    scaler: Option<Standardizer>,
    classes: Vec<usize>,
    cards: Vec<ScoreCard>,
}

impl Default for RiskScoreModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskScoreModel {
    pub fn new() -> Self {
        Self {
            l1_penalty: 0.01,
            max_coefficient: 5,
            learning_rate: 0.5,
            max_iter: 2000,
            tol: 1e-7,
            scaler: None,
            classes: Vec::new(),
            cards: Vec::new(),
        }
    }

    pub fn with_l1_penalty(mut self, penalty: f64) -> Self {
        self.l1_penalty = penalty;
        self
    }

    pub fn with_max_coefficient(mut self, max_coefficient: i64) -> Self {
        self.max_coefficient = max_coefficient;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// ISTA on the logistic loss; returns real-valued weights and intercept
    fn fit_sparse_logit(&self, x: &Array2<f64>, target: &Array1<f64>) -> (Array1<f64>, f64) {
        let n_samples = x.nrows() as f64;
        let mut w = Array1::<f64>::zeros(x.ncols());
        let mut b = 0.0;
        let step = self.learning_rate;

        for iter in 0..self.max_iter {
            let p = (x.dot(&w) + b).mapv(|z| 1.0 / (1.0 + (-z).exp()));
            let errors = &p - target;
            let grad = x.t().dot(&errors) / n_samples;
            let db = errors.mean().unwrap_or(0.0);

            let w_new = (&w - &(step * &grad)).mapv(|v| soft_threshold(v, step * self.l1_penalty));
            let change = (&w_new - &w).mapv(f64::abs).sum() + (step * db).abs();
            w = w_new;
            b -= step * db;

            if change < self.tol {
                debug!(iterations = iter + 1, "Sparse logit converged");
                break;
            }
        }
        (w, b)
    }

    /// Rescale so the largest weight maps to `max_coefficient`, then round
    fn integerize(&self, positive: usize, w: &Array1<f64>, b: f64) -> ScoreCard {
        let max_abs = w.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if max_abs < 1e-12 {
            return ScoreCard {
                positive,
                weights: vec![0; w.len()],
                intercept: if b > 0.0 { 1 } else { -1 },
            };
        }
        let scale = self.max_coefficient as f64 / max_abs;
        let limit = self.max_coefficient;
        ScoreCard {
            positive,
            weights: w
                .iter()
                .map(|v| ((v * scale).round() as i64).clamp(-limit, limit))
                .collect(),
            intercept: (b * scale).round() as i64,
        }
    }

    /// Fit on class indices
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(GlassboxError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(GlassboxError::InvalidInput(
                "cannot fit a risk score on zero rows".to_string(),
            ));
        }
        if self.max_coefficient < 1 {
            return Err(GlassboxError::invalid_parameter(
                "max_coefficient",
                self.max_coefficient,
                "must be at least 1",
            ));
        }

        let mut classes: Vec<usize> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let scaler = Standardizer::fit(x);
        let xs = scaler.transform(x);

        let positives: Vec<usize> = match classes.len() {
            1 => Vec::new(),
            2 => vec![classes[1]],
            _ => classes.clone(),
        };

        let cards: Vec<ScoreCard> = positives
            .par_iter()
            .map(|&positive| {
                let target = y.mapv(|c| if c == positive { 1.0 } else { 0.0 });
                let (w, b) = self.fit_sparse_logit(&xs, &target);
                self.integerize(positive, &w, b)
            })
            .collect();

        self.scaler = Some(scaler);
        self.classes = classes;
        self.cards = cards;
        Ok(self)
    }

    /// Integer-weighted scores, one column per score card
    pub fn scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scaler = self.scaler.as_ref().ok_or(GlassboxError::ModelNotFitted)?;
        if x.ncols() != scaler.mean.len() {
            return Err(GlassboxError::ShapeError {
                expected: format!("{} features", scaler.mean.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let z = scaler.transform(x);
        let mut scores = Array2::zeros((x.nrows(), self.cards.len()));
        for (i, row) in z.rows().into_iter().enumerate() {
            for (k, card) in self.cards.iter().enumerate() {
                scores[[i, k]] = card.score(row);
            }
        }
        Ok(scores)
    }

    /// Predict class indices; score ties resolve to the lower class
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let scores = self.scores(x)?;
        Ok(match self.classes.len() {
            1 => Array1::from_elem(x.nrows(), self.classes[0]),
            2 => scores
                .column(0)
                .mapv(|s| if s > 0.0 { self.classes[1] } else { self.classes[0] }),
            _ => scores
                .rows()
                .into_iter()
                .map(|row| {
                    let best = crate::utils::argmax(row).unwrap_or(0);
                    self.classes[best]
                })
                .collect(),
        })
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn score_cards(&self) -> &[ScoreCard] {
        &self.cards
    }

    /// Total nonzero integer weights across all score cards
    pub fn n_nonzero(&self) -> usize {
        self.cards.iter().map(|c| c.support().len()).sum()
    }

    /// Printable score card
    pub fn describe(&self, feature_names: &[String]) -> String {
        let mut out = String::new();
        if self.classes.len() == 1 {
            let _ = writeln!(out, "constant prediction: class {}", self.classes[0]);
            return out;
        }
        for card in &self.cards {
            let header = if self.classes.len() == 2 {
                format!(
                    "predict class {} when score > 0, otherwise class {}",
                    card.positive, self.classes[0]
                )
            } else {
                format!("score for class {} (highest score wins)", card.positive)
            };
            let _ = writeln!(out, "{}", header);
            let _ = writeln!(out, "  {:>4}  (intercept)", card.intercept);
            for j in card.support() {
                let name = feature_names
                    .get(j)
                    .cloned()
                    .unwrap_or_else(|| format!("x[{}]", j));
                let _ = writeln!(out, "  {:>+4}  x z({})", card.weights[j], name);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn threshold_data() -> (Array2<f64>, Array1<usize>) {
        // Label depends on column 0 only; column 1 is noise
        let x = Array2::from_shape_fn((40, 2), |(i, j)| {
            if j == 0 {
                i as f64 - 19.5
            } else {
                ((i * 37) % 11) as f64
            }
        });
        let y = x.column(0).mapv(|v| (v > 0.0) as usize);
        (x, y)
    }

    #[test]
    fn test_integer_weights_within_bounds() {
        let (x, y) = threshold_data();
        let mut model = RiskScoreModel::new().with_max_coefficient(3);
        model.fit(&x, &y).unwrap();

        let card = &model.score_cards()[0];
        assert!(card.weights.iter().all(|w| w.abs() <= 3));
        assert_eq!(card.weights[0], 3);
    }

    #[test]
    fn test_recovers_threshold_rule() {
        let (x, y) = threshold_data();
        let mut model = RiskScoreModel::new();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        let agree = pred.iter().zip(y.iter()).filter(|(a, b)| a == b).count();
        assert!(agree as f64 / y.len() as f64 >= 0.95);
    }

    #[test]
    fn test_strong_penalty_zeroes_noise() {
        let (x, y) = threshold_data();
        let mut model = RiskScoreModel::new().with_l1_penalty(0.2);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.score_cards()[0].support(), vec![0]);
        assert_eq!(model.n_nonzero(), 1);
    }

    #[test]
    fn test_multiclass_has_card_per_class() {
        let x = array![[0.0], [0.1], [5.0], [5.1], [10.0], [10.1]];
        let y = array![0, 0, 1, 1, 2, 2];
        let mut model = RiskScoreModel::new();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.score_cards().len(), 3);
        assert!(model.describe(&["dose".to_string()]).contains("highest score wins"));
    }

    #[test]
    fn test_rejects_zero_max_coefficient() {
        let (x, y) = threshold_data();
        let mut model = RiskScoreModel::new().with_max_coefficient(0);
        assert!(matches!(
            model.fit(&x, &y),
            Err(GlassboxError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_describe_lists_support() {
        let (x, y) = threshold_data();
        let mut model = RiskScoreModel::new().with_l1_penalty(0.2);
        model.fit(&x, &y).unwrap();
        let text = model.describe(&["signal".to_string(), "noise".to_string()]);
        assert!(text.contains("z(signal)"));
        assert!(!text.contains("z(noise)"));
    }
}

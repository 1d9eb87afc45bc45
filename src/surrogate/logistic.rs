//! Logistic regression surrogate (one-vs-rest for more than two classes)

use crate::error::{GlassboxError, Result};
use crate::utils::{argmax, Standardizer};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

/// One fitted binary problem, in standardized feature space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryLogit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    /// Gradient descent iterations actually run
    pub n_iter: usize,
}

/// L2-regularized logistic regression fit by full-batch gradient descent.
///
/// Weights start at zero, so a fit is a pure function of the data and the
/// hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Maximum iterations per binary problem
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    scaler: Option<Standardizer>,
    classes: Vec<usize>,
    models: Vec<BinaryLogit>,
    is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            alpha: 0.01,
            learning_rate: 0.5,
            max_iter: 1000,
            tol: 1e-6,
            scaler: None,
            classes: Vec::new(),
            models: Vec::new(),
            is_fitted: false,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    fn fit_binary(&self, x: &Array2<f64>, target: &Array1<f64>) -> BinaryLogit {
        let n_samples = x.nrows() as f64;
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let predictions = (x.dot(&weights) + bias).mapv(Self::sigmoid);
            let errors = &predictions - target;
            let dw = x.t().dot(&errors) / n_samples + self.alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        BinaryLogit {
            coefficients: weights,
            intercept: bias,
            n_iter,
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
                "cannot fit logistic regression on zero rows".to_string(),
            ));
        }

        let mut classes: Vec<usize> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let scaler = Standardizer::fit(x);
        let xs = scaler.transform(x);

        // Two classes share a single problem; more classes get one per class.
        let positives: Vec<usize> = match classes.len() {
            1 => Vec::new(),
            2 => vec![classes[1]],
            _ => classes.clone(),
        };

        let models: Vec<BinaryLogit> = positives
            .par_iter()
            .map(|&positive| {
                let target = y.mapv(|c| if c == positive { 1.0 } else { 0.0 });
                self.fit_binary(&xs, &target)
            })
            .collect();

        for (positive, model) in positives.iter().zip(&models) {
            debug!(class = positive, n_iter = model.n_iter, "Fitted binary logit");
        }

        self.scaler = Some(scaler);
        self.classes = classes;
        self.models = models;
        self.is_fitted = true;
        Ok(self)
    }

    fn scaled(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scaler = self.scaler.as_ref().ok_or(GlassboxError::ModelNotFitted)?;
        if x.ncols() != scaler.mean.len() {
            return Err(GlassboxError::ShapeError {
                expected: format!("{} features", scaler.mean.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(scaler.transform(x))
    }

    /// Linear scores, one column per binary problem
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(GlassboxError::ModelNotFitted);
        }
        let xs = self.scaled(x)?;
        let mut scores = Array2::zeros((x.nrows(), self.models.len()));
        for (j, model) in self.models.iter().enumerate() {
            let col = xs.dot(&model.coefficients) + model.intercept;
            scores.column_mut(j).assign(&col);
        }
        Ok(scores)
    }

    /// Probabilities with one column per entry of [`classes`](Self::classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scores = self.decision_function(x)?;
        let n = x.nrows();
        match self.classes.len() {
            1 => Ok(Array2::ones((n, 1))),
            2 => {
                let p = scores.column(0).mapv(Self::sigmoid);
                let mut proba = Array2::zeros((n, 2));
                proba.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
                proba.column_mut(1).assign(&p);
                Ok(proba)
            }
            _ => {
                let mut proba = scores.mapv(Self::sigmoid);
                for mut row in proba.axis_iter_mut(Axis(0)) {
                    let total = row.sum();
                    if total > 0.0 {
                        row.mapv_inplace(|v| v / total);
                    }
                }
                Ok(proba)
            }
        }
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let scores = self.decision_function(x)?;
        Ok(match self.classes.len() {
            1 => Array1::from_elem(x.nrows(), self.classes[0]),
            2 => scores
                .column(0)
                .mapv(|z| if z > 0.0 { self.classes[1] } else { self.classes[0] }),
            _ => scores
                .rows()
                .into_iter()
                .map(|row| self.classes[argmax(row).unwrap_or(0)])
                .collect(),
        })
    }

    /// Classes seen during fit, ascending
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    /// Coefficients and intercepts mapped back to raw feature units,
    /// one row per binary problem
    pub fn raw_coefficients(&self) -> Option<(Array2<f64>, Array1<f64>)> {
        let scaler = self.scaler.as_ref()?;
        let n_features = scaler.mean.len();
        let mut coefs = Array2::zeros((self.models.len(), n_features));
        let mut intercepts = Array1::zeros(self.models.len());
        for (k, model) in self.models.iter().enumerate() {
            let raw = &model.coefficients / &scaler.scale;
            intercepts[k] = model.intercept - raw.dot(&scaler.mean);
            coefs.row_mut(k).assign(&raw);
        }
        Some((coefs, intercepts))
    }

    /// Coefficient table in raw feature units
    pub fn describe(&self, feature_names: &[String]) -> String {
        let Some((coefs, intercepts)) = self.raw_coefficients() else {
            return "logistic regression (not fitted)\n".to_string();
        };
        let mut out = String::new();
        let headers: Vec<String> = match self.classes.len() {
            1 => {
                let _ = writeln!(out, "constant prediction: class {}", self.classes[0]);
                return out;
            }
            2 => vec![format!("class {} vs {}", self.classes[1], self.classes[0])],
            _ => self.classes.iter().map(|c| format!("class {} vs rest", c)).collect(),
        };
        for (k, header) in headers.iter().enumerate() {
            let _ = writeln!(out, "{}", header);
            let _ = writeln!(out, "  {:<24} {:>12.6}", "(intercept)", intercepts[k]);
            for (j, w) in coefs.row(k).iter().enumerate() {
                let name = feature_names
                    .get(j)
                    .cloned()
                    .unwrap_or_else(|| format!("x[{}]", j));
                let _ = writeln!(out, "  {:<24} {:>12.6}", name, w);
            }
        }
        out
    }
}

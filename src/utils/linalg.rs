//! Small dense linear algebra helpers

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system `a x = b` via Cholesky.
///
/// A near-singular matrix gets a tiny diagonal ridge and one retry.
/// Returns `None` when the system is still not positive definite.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    cholesky_solve_inner(a, b).or_else(|| {
        let mut a_reg = a.clone();
        let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
        for k in 0..n {
            a_reg[[k, k]] += ridge.max(1e-12);
        }
        cholesky_solve_inner(&a_reg, b)
    })
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Result of a weighted ridge fit
#[derive(Debug, Clone)]
pub struct RidgeFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    /// Weighted coefficient of determination on the training rows
    pub score: f64,
}

/// Weighted ridge regression with an unpenalized intercept.
///
/// Minimizes `sum_i w_i (y_i - b - x_i . beta)^2 + alpha |beta|^2`.
/// Returns `None` if the weights sum to zero or the system cannot be solved.
pub fn weighted_ridge(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    weights: ArrayView1<'_, f64>,
    alpha: f64,
) -> Option<RidgeFit> {
    let n_features = x.ncols();
    let w_sum: f64 = weights.sum();
    if x.nrows() != y.len() || y.len() != weights.len() || !(w_sum > 0.0) {
        return None;
    }

    let x_mean = x
        .t()
        .dot(&weights)
        .mapv(|v| v / w_sum);
    let y_mean = y.dot(&weights) / w_sum;

    let x_c = &x - &x_mean.view().insert_axis(Axis(0));
    let y_c = &y - y_mean;

    // X_c^T W
    let xw = &x_c * &weights.view().insert_axis(Axis(1));
    let mut gram = xw.t().dot(&x_c);
    for j in 0..n_features {
        gram[[j, j]] += alpha;
    }
    let rhs = xw.t().dot(&y_c);

    let coefficients = cholesky_solve(&gram, &rhs)?;
    let intercept = y_mean - coefficients.dot(&x_mean);

    let fitted = x.dot(&coefficients) + intercept;
    let ss_res: f64 = fitted
        .iter()
        .zip(y.iter())
        .zip(weights.iter())
        .map(|((f, t), w)| w * (t - f).powi(2))
        .sum();
    let ss_tot: f64 = y
        .iter()
        .zip(weights.iter())
        .map(|(t, w)| w * (t - y_mean).powi(2))
        .sum();
    let score = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Some(RidgeFit {
        coefficients,
        intercept,
        score,
    })
}

/// Index of the largest finite value; ties go to the lowest index
pub fn argmax(values: ArrayView1<'_, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Per-column z-score scaling fitted on training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl Standardizer {
    /// Fit column means and standard deviations; constant columns get scale 1
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_features = x.ncols();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        Self { mean, scale }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean.view().insert_axis(Axis(0))) / &self.scale.view().insert_axis(Axis(0))
    }
}

//! Synthetic classification data
//!
//! Gaussian clusters placed on the vertices of a hypercube in the
//! informative subspace, padded with pure-noise features. Used to build
//! the demo black box and the benchmarks.

use crate::data::FeatureMatrix;
use crate::error::{GlassboxError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDataset {
    pub n_samples: usize,
    pub n_features: usize,
    /// Leading columns that carry class signal; the rest are noise
    pub n_informative: usize,
    pub n_classes: usize,
    pub n_clusters_per_class: usize,
    /// Half the edge length of the hypercube
    pub class_sep: f64,
    /// Fraction of labels replaced by a random class
    pub flip_y: f64,
    pub seed: u64,
}

impl Default for ClassificationDataset {
    fn default() -> Self {
        Self {
            n_samples: 200,
            n_features: 5,
            n_informative: 3,
            n_classes: 2,
            n_clusters_per_class: 2,
            class_sep: 1.0,
            flip_y: 0.01,
            seed: crate::config::DEFAULT_SEED,
        }
    }
}

impl ClassificationDataset {
    pub fn new(n_samples: usize, n_features: usize, n_informative: usize) -> Self {
        Self {
            n_samples,
            n_features,
            n_informative,
            ..Self::default()
        }
    }

    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_flip_y(mut self, flip_y: f64) -> Self {
        self.flip_y = flip_y;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(GlassboxError::invalid_parameter("n_samples", 0, "must be at least 1"));
        }
        if self.n_informative == 0 || self.n_informative > self.n_features {
            return Err(GlassboxError::invalid_parameter(
                "n_informative",
                self.n_informative,
                format!("must be in 1..={}", self.n_features),
            ));
        }
        if self.n_classes < 2 || self.n_clusters_per_class == 0 {
            return Err(GlassboxError::invalid_parameter(
                "n_classes",
                self.n_classes,
                "need at least 2 classes and 1 cluster per class",
            ));
        }
        let clusters = self.n_classes * self.n_clusters_per_class;
        if self.n_informative < 63 && clusters > 1usize << self.n_informative {
            return Err(GlassboxError::invalid_parameter(
                "n_informative",
                self.n_informative,
                format!("2^n_informative must be at least {} clusters", clusters),
            ));
        }
        if !(0.0..=1.0).contains(&self.flip_y) {
            return Err(GlassboxError::invalid_parameter(
                "flip_y",
                self.flip_y,
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }

    /// Features named `feature_i` and class indices
    pub fn generate(&self) -> Result<(FeatureMatrix, Array1<usize>)> {
        self.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n_clusters = self.n_classes * self.n_clusters_per_class;
        let n_inf = self.n_informative;

        // Distinct hypercube vertices, one per cluster
        let n_vertices = 1usize << n_inf.min(20);
        let vertices = rand::seq::index::sample(&mut rng, n_vertices, n_clusters).into_vec();

        let mut x = Array2::<f64>::zeros((self.n_samples, self.n_features));
        let mut y = Array1::<usize>::zeros(self.n_samples);

        let base = self.n_samples / n_clusters;
        let extra = self.n_samples % n_clusters;
        let mut row = 0;
        for (k, &vertex) in vertices.iter().enumerate() {
            let size = base + usize::from(k < extra);
            let centroid: Vec<f64> = (0..n_inf)
                .map(|d| if (vertex >> (d % 20)) & 1 == 1 { self.class_sep } else { -self.class_sep })
                .collect();
            // Random linear mixing gives each cluster its own covariance
            let mixing = Array2::from_shape_fn((n_inf, n_inf), |_| rng.gen_range(-1.0..1.0));

            for _ in 0..size {
                let z: Array1<f64> = (0..n_inf).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
                let point = z.dot(&mixing);
                for d in 0..n_inf {
                    x[[row, d]] = point[d] + centroid[d];
                }
                y[row] = k % self.n_classes;
                row += 1;
            }
        }

        for i in 0..self.n_samples {
            for j in n_inf..self.n_features {
                x[[i, j]] = rng.sample::<f64, _>(StandardNormal);
            }
        }

        for label in y.iter_mut() {
            if rng.gen::<f64>() < self.flip_y {
                *label = rng.gen_range(0..self.n_classes);
            }
        }

        let mut order: Vec<usize> = (0..self.n_samples).collect();
        order.shuffle(&mut rng);
        let x = x.select(ndarray::Axis(0), &order);
        let y: Array1<usize> = order.iter().map(|&i| y[i]).collect();

        debug!(
            samples = self.n_samples,
            features = self.n_features,
            informative = n_inf,
            "Generated synthetic classification data"
        );
        Ok((FeatureMatrix::from_array(x), y))
    }
}

/// Binary dataset with the default cluster layout
pub fn make_classification(
    n_samples: usize,
    n_features: usize,
    n_informative: usize,
    seed: u64,
) -> Result<(FeatureMatrix, Array1<usize>)> {
    ClassificationDataset::new(n_samples, n_features, n_informative)
        .with_seed(seed)
        .generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_and_names() {
        let (x, y) = make_classification(200, 5, 3, 42).unwrap();
        assert_eq!(x.n_rows(), 200);
        assert_eq!(x.n_features(), 5);
        assert_eq!(x.names()[4], "feature_4");
        assert_eq!(y.len(), 200);
        assert!(y.iter().all(|&c| c < 2));
    }

    #[test]
    fn test_roughly_balanced() {
        let (_, y) = make_classification(400, 4, 2, 1).unwrap();
        let ones = y.iter().filter(|&&c| c == 1).count();
        assert!((150..=250).contains(&ones), "{} positives", ones);
    }

    #[test]
    fn test_deterministic() {
        let a = make_classification(50, 3, 2, 9).unwrap();
        let b = make_classification(50, 3, 2, 9).unwrap();
        assert_eq!(a, b);
        let c = make_classification(50, 3, 2, 10).unwrap();
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn test_noise_columns_are_standard_normal() {
        let (x, _) = make_classification(2000, 4, 2, 3).unwrap();
        for j in 2..4 {
            let column = x.values().column(j);
            let mean = column.mean().unwrap();
            let std = column.std(0.0);
            assert!(mean.abs() < 0.1, "column {} mean {}", j, mean);
            assert!((std - 1.0).abs() < 0.1, "column {} std {}", j, std);
        }
    }

    #[test]
    fn test_multiclass() {
        let (_, y) = ClassificationDataset::new(90, 4, 3).with_classes(3).generate().unwrap();
        let mut seen: Vec<usize> = y.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(make_classification(10, 2, 3, 0).is_err());
        assert!(make_classification(0, 2, 1, 0).is_err());
        // 2 classes x 2 clusters need at least 2 informative features
        assert!(make_classification(10, 2, 1, 0).is_err());
    }
}

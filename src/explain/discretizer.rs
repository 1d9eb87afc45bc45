//! Quartile discretization of continuous features

use crate::error::{GlassboxError, Result};
use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Linearly interpolated percentile of an ascending slice
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Bin layout of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBins {
    /// Ascending unique cut points
    pub cuts: Vec<f64>,
    /// Training values that fell into each bin
    pub pools: Vec<Vec<f64>>,
}

impl FeatureBins {
    fn fit(column: ArrayView1<'_, f64>) -> Self {
        let mut sorted: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut cuts: Vec<f64> = if sorted.is_empty() {
            vec![0.0]
        } else {
            [0.25, 0.5, 0.75].iter().map(|&q| percentile(&sorted, q)).collect()
        };
        cuts.dedup();

        let mut bins = Self {
            pools: vec![Vec::new(); cuts.len() + 1],
            cuts,
        };
        for &v in &sorted {
            let b = bins.bin_of(v);
            bins.pools[b].push(v);
        }
        bins
    }

    /// Index `i` such that `cuts[i - 1] < value <= cuts[i]`
    pub fn bin_of(&self, value: f64) -> usize {
        self.cuts.partition_point(|&c| c < value)
    }

    pub fn n_bins(&self) -> usize {
        self.pools.len()
    }

    /// Draw a bin with probability proportional to its training frequency
    pub fn sample_bin<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let total: usize = self.pools.iter().map(Vec::len).sum();
        if total == 0 {
            return 0;
        }
        let mut pick = rng.gen_range(0..total);
        for (b, pool) in self.pools.iter().enumerate() {
            if pick < pool.len() {
                return b;
            }
            pick -= pool.len();
        }
        self.pools.len() - 1
    }

    /// Draw a training value from `bin`; an empty bin yields its nearest cut
    pub fn sample_value<R: Rng + ?Sized>(&self, bin: usize, rng: &mut R) -> f64 {
        match self.pools.get(bin) {
            Some(pool) if !pool.is_empty() => pool[rng.gen_range(0..pool.len())],
            _ => self.cuts[bin.min(self.cuts.len() - 1)],
        }
    }

    /// Condition text such as `0.12 < age <= 0.50`
    pub fn describe(&self, bin: usize, name: &str) -> String {
        let last = self.cuts.len();
        if bin == 0 {
            format!("{} <= {:.2}", name, self.cuts[0])
        } else if bin >= last {
            format!("{} > {:.2}", name, self.cuts[last - 1])
        } else {
            format!("{:.2} < {} <= {:.2}", self.cuts[bin - 1], name, self.cuts[bin])
        }
    }
}

/// Per-feature quartile bins fitted on a training matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuartileDiscretizer {
    features: Vec<FeatureBins>,
}

impl QuartileDiscretizer {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(GlassboxError::InvalidInput(format!(
                "cannot discretize a {}x{} matrix",
                x.nrows(),
                x.ncols()
            )));
        }
        Ok(Self {
            features: x.columns().into_iter().map(FeatureBins::fit).collect(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn feature(&self, index: usize) -> &FeatureBins {
        &self.features[index]
    }

    /// Bin index of every value in `row`
    pub fn discretize(&self, row: ArrayView1<'_, f64>) -> Vec<usize> {
        self.features
            .iter()
            .zip(row.iter())
            .map(|(bins, &v)| bins.bin_of(v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_quartile_cuts() {
        let x = Array1::range(1.0, 10.0, 1.0).insert_axis(ndarray::Axis(1));
        let disc = QuartileDiscretizer::fit(&x).unwrap();
        assert_eq!(disc.feature(0).cuts, vec![3.0, 5.0, 7.0]);
        assert_eq!(disc.feature(0).n_bins(), 4);
        assert_eq!(disc.discretize(array![3.0].view()), vec![0]);
        assert_eq!(disc.discretize(array![3.5].view()), vec![1]);
        assert_eq!(disc.discretize(array![100.0].view()), vec![3]);
    }

    #[test]
    fn test_duplicate_cuts_collapse() {
        let x = array![[0.0], [0.0], [0.0], [0.0], [1.0]];
        let disc = QuartileDiscretizer::fit(&x).unwrap();
        assert_eq!(disc.feature(0).cuts, vec![0.0]);
        assert_eq!(disc.feature(0).pools, vec![vec![0.0; 4], vec![1.0]]);
    }

    #[test]
    fn test_sampling_stays_in_bin() {
        let x = Array1::range(0.0, 100.0, 1.0).insert_axis(ndarray::Axis(1));
        let disc = QuartileDiscretizer::fit(&x).unwrap();
        let bins = disc.feature(0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let b = bins.sample_bin(&mut rng);
            let v = bins.sample_value(b, &mut rng);
            assert_eq!(bins.bin_of(v), b);
        }
    }

    #[test]
    fn test_describe_conditions() {
        let x = Array1::range(1.0, 10.0, 1.0).insert_axis(ndarray::Axis(1));
        let disc = QuartileDiscretizer::fit(&x).unwrap();
        let bins = disc.feature(0);
        assert_eq!(bins.describe(0, "age"), "age <= 3.00");
        assert_eq!(bins.describe(2, "age"), "5.00 < age <= 7.00");
        assert_eq!(bins.describe(3, "age"), "age > 7.00");
    }

    #[test]
    fn test_empty_matrix_rejected() {
        assert!(QuartileDiscretizer::fit(&Array2::zeros((0, 3))).is_err());
    }
}

//! Integration test: global importance aggregation

use glassbox::blackbox::{BlackBoxModel, LabelFn, ProbabilityFn};
use glassbox::config::ExplainConfig;
use glassbox::data::FeatureMatrix;
use glassbox::explain::DegradedReason;
use glassbox::{compute_global_importance, GlassboxError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashSet;

fn create_dataset(n: usize) -> FeatureMatrix {
    let mut noise_a = Vec::with_capacity(n);
    let mut signal = Vec::with_capacity(n);
    let mut noise_b = Vec::with_capacity(n);

    for i in 0..n {
        let x = i as f64;
        noise_a.push(((i * 7) % 13) as f64);
        signal.push(x / n as f64 * 4.0 - 2.0);
        noise_b.push((x * 0.37).sin());
    }

    let df = df!(
        "noise_a" => &noise_a,
        "signal" => &signal,
        "noise_b" => &noise_b
    )
    .unwrap();
    FeatureMatrix::from_dataframe(&df).unwrap()
}

/// Probability of class 1 rises with the `signal` column only
fn signal_model() -> impl BlackBoxModel {
    ProbabilityFn::new(|x: &Array2<f64>| {
        Ok(Array2::from_shape_fn((x.nrows(), 2), |(i, j)| {
            let p = 1.0 / (1.0 + (-3.0 * x[[i, 1]]).exp());
            if j == 1 {
                p
            } else {
                1.0 - p
            }
        }))
    })
}

fn fast_config() -> ExplainConfig {
    ExplainConfig::default().with_num_samples(400).with_seed(5)
}

#[cfg(feature = "lime")]
#[test]
fn test_ranking_is_complete() {
    let x = create_dataset(40);
    let imp = compute_global_importance(&x, &signal_model(), 10, &fast_config()).unwrap();

    let names: HashSet<&str> = imp.names().collect();
    let expected: HashSet<&str> = x.names().iter().map(String::as_str).collect();
    assert_eq!(imp.len(), x.n_features());
    assert_eq!(names, expected);
    assert!(imp.ranking.iter().all(|(_, s)| *s >= 0.0));
    assert!(imp.ranking.windows(2).all(|w| w[0].1 >= w[1].1));
    assert!(imp.degraded.is_none());
}

#[cfg(feature = "lime")]
#[test]
fn test_signal_ranks_first() {
    let x = create_dataset(40);
    let imp = compute_global_importance(&x, &signal_model(), 15, &fast_config()).unwrap();
    assert_eq!(imp.ranking[0].0, "signal");
}

#[cfg(feature = "lime")]
#[test]
fn test_sample_count_is_clamped() {
    let x = create_dataset(12);
    let model = signal_model();
    let exact = compute_global_importance(&x, &model, 12, &fast_config()).unwrap();
    let oversized = compute_global_importance(&x, &model, 500, &fast_config()).unwrap();
    assert_eq!(exact, oversized);
    assert_eq!(oversized.n_sampled, 12);
}

#[cfg(feature = "lime")]
#[test]
fn test_same_seed_same_ranking() {
    let x = create_dataset(30);
    let model = signal_model();
    let a = compute_global_importance(&x, &model, 8, &fast_config()).unwrap();
    let b = compute_global_importance(&x, &model, 8, &fast_config()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_label_only_model_degrades() {
    let x = create_dataset(20);
    let model = LabelFn::new(|x: &Array2<f64>| Ok(Array1::zeros(x.nrows())));
    let imp = compute_global_importance(&x, &model, 5, &fast_config()).unwrap();
    assert!(imp.is_empty());
    assert_eq!(imp.degraded, Some(DegradedReason::NoProbabilities));
}

#[cfg(not(feature = "lime"))]
#[test]
fn test_without_lime_degrades() {
    let x = create_dataset(20);
    let imp = compute_global_importance(&x, &signal_model(), 5, &fast_config()).unwrap();
    assert!(imp.is_empty());
    assert_eq!(imp.degraded, Some(DegradedReason::ExplainerUnavailable));
}

#[cfg(feature = "lime")]
#[test]
fn test_zero_sample_count_rejected() {
    let x = create_dataset(20);
    assert!(matches!(
        compute_global_importance(&x, &signal_model(), 0, &fast_config()),
        Err(GlassboxError::InvalidParameter { .. })
    ));
}

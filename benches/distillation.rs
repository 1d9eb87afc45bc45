use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glassbox::blackbox::RandomForest;
use glassbox::config::{DistillConfig, ExplainConfig};
use glassbox::surrogate::SurrogateStrategy;
use glassbox::synthetic::make_classification;
use glassbox::{compute_global_importance, train_surrogate};

fn create_teacher(n_rows: usize) -> (glassbox::data::FeatureMatrix, RandomForest) {
    let (x, y) = make_classification(n_rows, 10, 5, 42).unwrap();
    let mut forest = RandomForest::new(50).with_random_state(42);
    forest.fit(x.values(), &y).unwrap();
    (x, forest)
}

fn bench_surrogates(c: &mut Criterion) {
    let mut group = c.benchmark_group("surrogates");
    group.sample_size(10);

    let config = DistillConfig::default();
    for n_rows in [500, 2000].iter() {
        let (x, forest) = create_teacher(*n_rows);

        for strategy in SurrogateStrategy::all(3) {
            if !strategy.is_available() {
                continue;
            }
            group.bench_with_input(
                BenchmarkId::new(strategy.label(), n_rows),
                &x,
                |b, x| b.iter(|| train_surrogate(strategy, black_box(x), &forest, &config).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_global_importance(c: &mut Criterion) {
    let mut group = c.benchmark_group("global_importance");
    group.sample_size(10);

    let (x, forest) = create_teacher(500);
    let config = ExplainConfig::default().with_num_samples(1000);
    for samples in [10, 50].iter() {
        group.bench_with_input(BenchmarkId::new("lime", samples), samples, |b, &samples| {
            b.iter(|| compute_global_importance(black_box(&x), &forest, samples, &config).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_surrogates, bench_global_importance);
criterion_main!(benches);

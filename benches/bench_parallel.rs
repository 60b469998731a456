use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use acor_seir::acor::{AcorOptimizer, AcorOptions, RunLimits};
use acor_seir::pool::EvaluationPool;
use acor_seir::rng::RandomNumberGenerator;
use acor_seir::{Bounds, Challenge};

#[derive(Clone)]
struct Rastrigin;

impl Challenge for Rastrigin {
    fn score(&self, params: &[f64]) -> f64 {
        let a = 10.0;
        a * params.len() as f64
            + params
                .iter()
                .map(|x| x * x - a * (2.0 * std::f64::consts::PI * x).cos())
                .sum::<f64>()
    }
}

fn candidates(count: usize, dim: usize) -> Vec<Vec<f64>> {
    let bounds = Bounds::new(vec![(-5.12, 5.12); dim]).unwrap();
    let mut rng = RandomNumberGenerator::from_seed(1);
    (0..count).map(|_| bounds.sample_uniform(&mut rng)).collect()
}

fn bench_pool_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_evaluation");
    let sequential = EvaluationPool::new(Some(1), usize::MAX).unwrap();
    let parallel = EvaluationPool::new(None, 2).unwrap();

    // Test with different batch sizes
    for size in [10, 100, 1000, 10000].iter() {
        let batch = candidates(*size, 20);

        group.bench_with_input(BenchmarkId::new("sequential", size), &batch, |b, batch| {
            b.iter(|| sequential.evaluate(black_box(&Rastrigin), black_box(batch)))
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), &batch, |b, batch| {
            b.iter(|| parallel.evaluate(black_box(&Rastrigin), black_box(batch)))
        });
    }

    group.finish();
}

fn bench_optimizer_colonies(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer_colonies");
    group.sample_size(10);
    let bounds = Bounds::new(vec![(-5.12, 5.12); 10]).unwrap();

    for colonies in [1, 2, 4].iter() {
        group.bench_with_input(BenchmarkId::new("rastrigin", colonies), colonies, |b, &colonies| {
            b.iter(|| {
                let options = AcorOptions::builder()
                    .n_ants(20)
                    .archive_size(10)
                    .max_iter(50)
                    .colonies(colonies)
                    .migration_size(3)
                    .seed(3)
                    .build();
                let mut optimizer = AcorOptimizer::new(Rastrigin, bounds.clone(), options).unwrap();
                black_box(optimizer.optimize(RunLimits::default()).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pool_evaluation, bench_optimizer_colonies);
criterion_main!(benches);

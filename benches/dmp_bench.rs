// Benchmark for training and forward/reverse generation
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use reversible_dmp::config::{DmpConfig, GenerationOverrides};
use reversible_dmp::dmp::{DemoTrajectory, ReversibleDmp};

fn demo() -> DemoTrajectory {
    let positions = (0..=100)
        .map(|i| {
            let t = i as f64 / 100.0;
            vec![t, (std::f64::consts::PI * t).sin()]
        })
        .collect();
    DemoTrajectory::from_uniform(positions, 0.01).unwrap()
}

fn bench_train(c: &mut Criterion) {
    let mut dmp = ReversibleDmp::new(DmpConfig::with_dof(2)).unwrap();
    dmp.load_demo_trajectory(demo()).unwrap();
    c.bench_function("train 1000 basis, 2 dof", |b| {
        b.iter(|| {
            dmp.train().unwrap();
        });
    });
}

fn bench_generate(c: &mut Criterion) {
    let mut dmp = ReversibleDmp::new(DmpConfig::with_dof(2)).unwrap();
    dmp.load_demo_trajectory(demo()).unwrap();
    dmp.train().unwrap();
    let overrides = GenerationOverrides::default();
    c.bench_function("generate forward (1000 steps)", |b| {
        b.iter(|| {
            let out = dmp.generate_forward(&overrides).unwrap();
            assert_eq!(out.steps, 1000);
        });
    });
    c.bench_function("generate reverse (2 x 1000 steps)", |b| {
        b.iter(|| {
            let out = dmp.generate_reverse_trajectory(&overrides).unwrap();
            assert_eq!(out.steps, 1000);
        });
    });
}

criterion_group!(benches, bench_train, bench_generate);
criterion_main!(benches);

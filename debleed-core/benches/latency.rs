//! Latency benchmarks for debleed frame processing
//!
//! Run with: cargo bench --bench latency

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use debleed_core::{CancellationMode, Config, DebleedProcessor};

fn frame_size_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_processing");

    for &size in [128usize, 256, 512, 1024].iter() {
        let mut config = Config::default();
        config.session.frame_size = size;
        config.params.max_lag = size / 2;
        let mut processor = DebleedProcessor::new(config).unwrap();

        let mic = vec![0.1f32; size];
        let reference = vec![0.05f32; size];
        let mut output = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("hybrid", size), &size, |b, _| {
            b.iter(|| {
                processor
                    .process_frame(black_box(&mic), black_box(&reference), &mut output)
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn mode_comparison_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("modes");

    for &mode in CancellationMode::all() {
        let mut config = Config::default();
        config.params.mode = mode;
        let size = config.session.frame_size;
        let mut processor = DebleedProcessor::new(config).unwrap();

        let mic = vec![0.1f32; size];
        let reference = vec![0.05f32; size];
        let mut output = vec![0.0f32; size];

        group.bench_with_input(
            BenchmarkId::new("process_256", mode),
            &mode,
            |b, _| {
                b.iter(|| {
                    processor
                        .process_frame(black_box(&mic), black_box(&reference), &mut output)
                        .unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, frame_size_benchmark, mode_comparison_benchmark);
criterion_main!(benches);

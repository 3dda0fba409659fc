//! `GapDetector::check` cost on the UDP receive hot path: must stay cheap
//! since it runs once per received record, gap or not.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use md_core::subscriber::GapDetector;

fn no_gap_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("gap_detector/no_gap");
    group.significance_level(0.01).sample_size(10000);

    group.bench_function("contiguous_sequence", |b| {
        let mut detector = GapDetector::new();
        let mut seq = 0u64;
        b.iter(|| {
            seq += 1;
            black_box(detector.check(seq));
        });
    });

    group.finish();
}

fn gap_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("gap_detector/gap");
    group.significance_level(0.01).sample_size(10000);

    group.bench_function("every_other_sequence_skips_one", |b| {
        let mut detector = GapDetector::new();
        let mut seq = 0u64;
        b.iter(|| {
            seq += 2;
            black_box(detector.check(seq));
        });
    });

    group.finish();
}

criterion_group!(benches, no_gap_bench, gap_bench);
criterion_main!(benches);

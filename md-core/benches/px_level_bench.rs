//! `PxLevel`/`OBSide` mutation throughput: the per-record hot path for
//! `addOrder`/`modifyOrder`/`pxLevel` dispatch.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use md_core::book::{Order, OBSide, PxLevel};
use md_core::core::{DateTime, Side, Value};

fn v(n: i64) -> Value {
    Value::new(n)
}

fn px_level_update_abs_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("px_level/update_abs");
    group.significance_level(0.01).sample_size(10000);

    let mut level = PxLevel::new(v(10000));
    group.bench_function("update_abs", |b| {
        b.iter(|| black_box(level.update_abs(DateTime::NULL, v(100), 1, 0)));
    });

    group.finish();
}

fn obside_add_remove_order_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("obside/add_remove_order");
    group.significance_level(0.01).sample_size(10000);

    group.bench_function("add_order", |b| {
        let mut side = OBSide::new(Side::Buy);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            side.add_order(DateTime::NULL, Order::new(format!("o{i}"), Side::Buy, v(100), v(10), 0));
        });
    });

    group.bench_function("find_order", |b| {
        let mut side = OBSide::new(Side::Buy);
        for i in 0..1000 {
            side.add_order(DateTime::NULL, Order::new(format!("o{i}"), Side::Buy, v(100 + i), v(10), 0));
        }
        b.iter(|| black_box(side.find_order("o500")));
    });

    group.finish();
}

criterion_group!(benches, px_level_update_abs_bench, obside_add_remove_order_bench);
criterion_main!(benches);

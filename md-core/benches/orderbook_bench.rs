//! `OrderBook` end-to-end mutation throughput: `addOrder`, `modifyOrder`,
//! `cancelOrder`, and L1 derivation, the shard's per-record dispatch cost.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use md_core::book::{Order, OrderBook};
use md_core::core::{InstrumentId, InstrumentKey, Ndp, SegmentId, Side, Value, VenueId};

fn key() -> InstrumentKey {
    InstrumentKey::new(VenueId::new("XTKS"), SegmentId::new("0"), InstrumentId::new("SYM1"))
}

fn book() -> OrderBook {
    OrderBook::new(key(), Ndp::new(2).unwrap(), Ndp::new(0).unwrap())
}

fn v(n: i64) -> Value {
    Value::new(n)
}

fn add_order_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook/add_order");
    group.significance_level(0.01).sample_size(5000);

    group.bench_function("empty_side", |b| {
        let mut ob = book();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            ob.add_order(Order::new(format!("o{i}"), Side::Buy, v(100), v(10), 0));
        });
    });

    group.finish();
}

fn modify_cancel_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook/modify_cancel");
    group.significance_level(0.01).sample_size(5000);

    group.bench_function("modify_order", |b| {
        let mut ob = book();
        ob.add_order(Order::new("o1", Side::Buy, v(100), v(10), 0));
        let mut px = 100i64;
        b.iter(|| {
            px += 1;
            ob.modify_order(Order::new("o1", Side::Buy, v(px), v(10), 0));
        });
    });

    group.bench_function("cancel_then_readd", |b| {
        let mut ob = book();
        b.iter(|| {
            ob.add_order(Order::new("o1", Side::Buy, v(100), v(10), 0));
            black_box(ob.cancel_order("o1", Side::Buy).unwrap());
        });
    });

    group.finish();
}

fn derive_l2_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook/derive_l2");
    group.significance_level(0.01).sample_size(5000);

    group.bench_function("after_add_order", |b| {
        let mut ob = book();
        ob.add_order(Order::new("o1", Side::Buy, v(100), v(10), 0));
        b.iter(|| black_box(ob.derive_l2()));
    });

    group.finish();
}

criterion_group!(benches, add_order_bench, modify_cancel_bench, derive_l2_bench);
criterion_main!(benches);

//! `Value::rescale` and full-book `update_ndp` migration cost — invariant 6
//! requires this to stay cheap enough to run inline on a shard thread.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use md_core::book::{Order, OrderBook};
use md_core::core::{InstrumentId, InstrumentKey, Ndp, SegmentId, Side, Value, VenueId};

fn key() -> InstrumentKey {
    InstrumentKey::new(VenueId::new("XTKS"), SegmentId::new("0"), InstrumentId::new("SYM1"))
}

fn value_rescale_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("ndp/value_rescale");
    group.significance_level(0.01).sample_size(10000);

    let value = Value::new(123_456);
    let from = Ndp::new(2).unwrap();
    let to = Ndp::new(4).unwrap();

    group.bench_function("scale_up", |b| {
        b.iter(|| black_box(value.rescale(from, to)));
    });
    group.bench_function("scale_down", |b| {
        b.iter(|| black_box(value.rescale(to, from)));
    });

    group.finish();
}

fn order_book_update_ndp_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("ndp/order_book_update_ndp");
    group.significance_level(0.01).sample_size(1000);

    group.bench_function("100_orders_per_side", |b| {
        b.iter_batched(
            || {
                let mut ob = OrderBook::new(key(), Ndp::new(2).unwrap(), Ndp::new(0).unwrap());
                for i in 0..100i64 {
                    ob.add_order(Order::new(format!("b{i}"), Side::Buy, Value::new(100 + i), Value::new(10), 0));
                    ob.add_order(Order::new(format!("a{i}"), Side::Sell, Value::new(200 + i), Value::new(10), 0));
                }
                ob
            },
            |mut ob| {
                ob.update_ndp(Ndp::new(4).unwrap(), Ndp::new(0).unwrap(), |_| {}).unwrap();
                black_box(ob);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, value_rescale_bench, order_book_update_ndp_bench);
criterion_main!(benches);

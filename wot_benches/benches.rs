//! Tree insert and collection benchmarks.
//!
//! Run with: cargo bench -p wot_benches

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use wot::{OptionsBuilder, RecordField, Runtime, ThingId};

fn runtime(pool_capacity: usize) -> Runtime {
    Runtime::new(
        OptionsBuilder::new()
            .pool_capacity(pool_capacity)
            .symbol_capacity(1024)
            .build(),
    )
}

/// A thing whose properties object holds `count` numbers
fn populated(count: usize) -> (Runtime, ThingId) {
    let mut rt = runtime(4 * count + 64);
    let thing = rt.thing("bench").unwrap();
    for i in 0..count {
        let value = rt.new_unsigned(i as u32).unwrap();
        rt.set_property(thing, &format!("p{}", i), value).unwrap();
    }
    (rt, thing)
}

fn bench_tree_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_insert");

    for count in [16usize, 128, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut rt = runtime(4 * count + 64);
                    let thing = rt.thing("bench").unwrap();
                    let array = rt.new_array().unwrap();
                    rt.set_property(thing, "items", array).unwrap();
                    (rt, array)
                },
                |(mut rt, array)| {
                    for i in 0..count {
                        let value = rt.new_unsigned(i as u32).unwrap();
                        rt.push(array, value).unwrap();
                    }
                    black_box(rt)
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_tree_lookup(c: &mut Criterion) {
    let (rt, thing) = populated(500);
    let properties = rt.record_object(thing, RecordField::Properties).unwrap();

    c.bench_function("tree_lookup", |b| {
        b.iter(|| black_box(rt.get(properties, black_box("p250"))));
    });
}

fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");

    for count in [16usize, 128, 1000] {
        group.bench_with_input(BenchmarkId::new("full", count), &count, |b, &count| {
            let (mut rt, _) = populated(count);
            b.iter(|| black_box(rt.collect_full()));
        });
    }

    group.bench_function("stale_churn", |b| {
        let mut rt = runtime(256);
        let thing = rt.thing("bench").unwrap();
        b.iter(|| {
            let reading = rt.new_object().unwrap();
            rt.set_property(thing, "reading", reading).unwrap();
            let value = rt.new_number(1.5).unwrap();
            rt.insert(reading, "value", value).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tree_insert, bench_tree_lookup, bench_collect);
criterion_main!(benches);

//! Trigger fan-out and computed chain benchmarks.

use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{Computed, Runtime};
use serde_json::json;

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for subscribers in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, &n| {
            let rt = Runtime::new();
            let source = rt.create_ref(0u64);
            let sink = Rc::new(Cell::new(0u64));

            for _ in 0..n {
                let (source, sink) = (source.clone(), Rc::clone(&sink));
                rt.effect(move || sink.set(sink.get().wrapping_add(source.get())))
                    .unwrap();
            }

            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                source.set(black_box(next)).unwrap();
            });
        });
    }

    group.finish();
}

fn computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let rt = Runtime::new();
            let base = rt.create_ref(0i64);
            let mut tail: Computed<i64> = {
                let base = base.clone();
                rt.computed(move || base.get() + 1).unwrap()
            };
            for _ in 1..depth {
                let previous = tail.clone();
                tail = rt.computed(move || previous.get() + 1).unwrap();
            }

            let mut next = 0i64;
            b.iter(|| {
                next += 1;
                base.set(next).unwrap();
                black_box(tail.get_untracked())
            });
        });
    }

    group.finish();
}

fn object_fields(c: &mut Criterion) {
    c.bench_function("object_field_write", |b| {
        let rt = Runtime::new();
        let product = rt.reactive(json!({"price": 5, "quantity": 2})).unwrap();
        let total = {
            let product = product.clone();
            rt.computed(move || {
                let price: f64 = product.get_as("price").unwrap().unwrap_or_default();
                let quantity: f64 = product.get_as("quantity").unwrap().unwrap_or_default();
                price * quantity
            })
            .unwrap()
        };

        let mut quantity = 0u64;
        b.iter(|| {
            quantity += 1;
            product.set("quantity", quantity).unwrap();
            black_box(total.get_untracked())
        });
    });
}

criterion_group!(benches, fan_out, computed_chain, object_fields);
criterion_main!(benches);

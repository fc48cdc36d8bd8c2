//! Benchmarks for notification fan-out and derived recomputation.
//!
//! Run with: cargo bench -p cartkit-runtime -- notify

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use cartkit_runtime::reactive::{Observable, Subscription, derived, derived_all};

// ---------------------------------------------------------------------------
// 1. Fan-out to many subscribers
// ---------------------------------------------------------------------------

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/fan_out");

    for count in [1u64, 16, 256] {
        group.throughput(Throughput::Elements(count));
        let cell = Observable::new(0u64);
        let subs: Vec<Subscription> = (0..count)
            .map(|_| {
                cell.subscribe(|v: &u64| {
                    black_box(*v);
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("set", count), &(), |b, _| {
            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                cell.set(black_box(next));
            });
        });
        drop(subs);
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Derived chain and wide derivation
// ---------------------------------------------------------------------------

fn bench_derived(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/derived");

    let base = Observable::new(0i64);
    let doubled = derived(&base, |v: &i64| v * 2);
    let shifted = derived(&doubled, |v: &i64| v + 1);
    let _chain = shifted.subscribe(|v: &i64| {
        black_box(*v);
    });
    group.bench_function("chain_depth_2", |b| {
        let mut next = 0i64;
        b.iter(|| {
            next += 1;
            base.set(black_box(next));
        });
    });

    let sources: Vec<Observable<i64>> = (0..64).map(Observable::new).collect();
    if let Ok(total) = derived_all(&sources, |vals: &[i64]| vals.iter().sum::<i64>()) {
        let _wide = total.subscribe(|v: &i64| {
            black_box(*v);
        });
        group.bench_function("sum_of_64", |b| {
            let mut next = 0i64;
            b.iter(|| {
                next += 1;
                sources[(next % 64) as usize].set(black_box(next));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_derived);
criterion_main!(benches);

//! Machine pool benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickfsm_core::{Blueprint, Comparator, MachineBuilder, Pool, TransitionSpec, ValueType};

fn npc_builder() -> MachineBuilder {
    let bp = Blueprint::new()
        .variable("hp", ValueType::Integer)
        .variable("alert", ValueType::Boolean)
        .variable("distance", ValueType::Float)
        .initial_state("idle")
        .state("chase")
        .state("attack")
        .state("flee")
        .transition(TransitionSpec::new("idle", "chase").when("alert", Comparator::Equal, true))
        .transition(TransitionSpec::new("chase", "attack").when("distance", Comparator::LessThan, 2.0f32))
        .transition(TransitionSpec::from_any(["chase", "attack"], "flee").when("hp", Comparator::LessThan, 20))
        .transition(TransitionSpec::new("flee", "idle").when("alert", Comparator::Equal, false));
    MachineBuilder::new(bp)
}

fn bench_get_recycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_get_recycle");
    group.throughput(Throughput::Elements(1));

    let builder = npc_builder();

    group.bench_function("warm", |b| {
        let mut pool = Pool::new(&builder, (), 16).unwrap();
        b.iter(|| {
            let h = pool.get();
            pool.recycle(black_box(h));
        })
    });

    group.bench_function("build_without_pool", |b| {
        b.iter(|| black_box(builder.build_default().unwrap()))
    });

    group.finish();
}

fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_growth");

    let builder = npc_builder();
    for count in [64usize, 1024] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut pool = Pool::new(&builder, (), 1).unwrap();
                for _ in 0..count {
                    black_box(pool.get());
                }
                pool.capacity()
            })
        });
    }

    group.finish();
}

fn bench_tick_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_update_all");

    let builder = npc_builder();
    for count in [100usize, 10_000] {
        let mut pool = Pool::new(&builder, (), count).unwrap();
        for i in 0..count {
            let h = pool.get();
            pool[h].set_boolean("alert", i % 2 == 0);
            pool[h].set_integer("hp", (i % 100) as i32);
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::from_parameter(count), |b| {
            b.iter(|| black_box(pool.update_all()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_get_recycle, bench_growth, bench_tick_all);
criterion_main!(benches);

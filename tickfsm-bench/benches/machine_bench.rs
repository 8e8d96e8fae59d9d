//! Tick evaluation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickfsm_core::{Blueprint, Comparator, Machine, MachineBuilder, OperandSpec, TransitionSpec, ValueType};

fn scenario_blueprint() -> Blueprint {
    Blueprint::new()
        .variable("v1", ValueType::Integer)
        .variable("v2", ValueType::Float)
        .variable("v3", ValueType::Boolean)
        .variable_with("v4", -10.15f32)
        .initial_state("foo")
        .state("bar")
        .state("plop")
        .state("toto")
        .transition(TransitionSpec::new("foo", "bar").when("v1", Comparator::Equal, 42))
        .transition(
            TransitionSpec::new("bar", "plop")
                .when("v2", Comparator::GreaterThan, 100.0f32)
                .when("v3", Comparator::Equal, true),
        )
        .transition(
            TransitionSpec::new("plop", "foo")
                .when("v3", Comparator::Equal, false)
                .when("v1", Comparator::LessThan, 42),
        )
        .transition(TransitionSpec::new("foo", "toto").when(
            "v2",
            Comparator::LessThan,
            OperandSpec::var("v4"),
        ))
}

/// A ring of `n` states; every state has `n` guarded exits and only the
/// last one matches, so a tick walks the whole list.
fn wide_blueprint(n: usize) -> Blueprint {
    let mut bp = Blueprint::new().variable("step", ValueType::Integer);
    for i in 0..n {
        let name = format!("s{}", i);
        bp = if i == 0 { bp.initial_state(name) } else { bp.state(name) };
    }
    for i in 0..n {
        for j in 0..n {
            let guard = if j == n - 1 { Comparator::GreaterOrEqual } else { Comparator::LessThan };
            bp = bp.transition(
                TransitionSpec::new(format!("s{}", i), format!("s{}", (i + 1) % n))
                    .when("step", guard, 0),
            );
        }
    }
    bp
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("machine_build");

    let scenario: MachineBuilder = MachineBuilder::new(scenario_blueprint());
    group.bench_function("scenario", |b| {
        b.iter(|| black_box(scenario.build_default().unwrap()))
    });

    let json = serde_json::to_value(scenario_blueprint()).unwrap();
    group.bench_function("scenario_from_json", |b| {
        b.iter(|| black_box(Blueprint::from_json(black_box(&json)).unwrap()))
    });

    for n in [8, 32] {
        let builder: MachineBuilder = MachineBuilder::new(wide_blueprint(n));
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("wide", n), &builder, |b, builder| {
            b.iter(|| black_box(builder.build_default().unwrap()))
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("machine_update");
    group.throughput(Throughput::Elements(1));

    let builder: MachineBuilder = MachineBuilder::new(scenario_blueprint());

    group.bench_function("settled", |b| {
        let mut m = builder.build_default().unwrap();
        b.iter(|| black_box(m.update()))
    });

    group.bench_function("scenario_cycle", |b| {
        let mut m = builder.build_default().unwrap();
        b.iter(|| {
            m.set_integer("v1", 42);
            m.update();
            m.set_float("v2", 100.625);
            m.set_boolean("v3", true);
            m.update();
            m.set_integer("v1", 30);
            m.set_boolean("v3", false);
            m.update();
            m.set_float("v2", 0.0);
            black_box(m.current())
        })
    });

    // Index-based access skips the name lookup.
    group.bench_function("scenario_cycle_by_id", |b| {
        let mut m: Machine = builder.build_default().unwrap();
        let v1 = m.variable_id("v1").unwrap();
        let v2 = m.variable_id("v2").unwrap();
        let v3 = m.variable_id("v3").unwrap();
        b.iter(|| {
            m.variable_at_mut(v1).set_integer(42);
            m.update();
            m.variable_at_mut(v2).set_float(100.625);
            m.variable_at_mut(v3).set_boolean(true);
            m.update();
            m.variable_at_mut(v1).set_integer(30);
            m.variable_at_mut(v3).set_boolean(false);
            m.update();
            m.variable_at_mut(v2).set_float(0.0);
            black_box(m.current())
        })
    });

    for n in [8, 32] {
        let builder: MachineBuilder = MachineBuilder::new(wide_blueprint(n));
        group.bench_with_input(BenchmarkId::new("wide", n), &builder, |b, builder| {
            let mut m = builder.build_default().unwrap();
            b.iter(|| black_box(m.update()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_update);
criterion_main!(benches);

//! End-to-end scenario: a blueprint loaded from JSON, driven tick by tick,
//! standalone and through a pool.

use tickfsm_core::{Blueprint, Machine, MachineBuilder, Pool, ValueType};

const SCENARIO: &str = include_str!("data/scenario.json");

fn builder() -> MachineBuilder {
    let blueprint: Blueprint = SCENARIO.parse().expect("scenario blueprint parses");
    MachineBuilder::new(blueprint)
}

/// Drives a machine through the whole scenario, starting from defaults.
fn run_scenario(m: &mut Machine) {
    assert_eq!(m.variable("v1").unwrap().value_type(), ValueType::Integer);
    assert_eq!(m.variable("v2").unwrap().value_type(), ValueType::Float);
    assert_eq!(m.variable("v3").unwrap().value_type(), ValueType::Boolean);
    assert_eq!(m.variable("v4").unwrap().value_type(), ValueType::Float);

    assert_eq!(m.get_integer("v1"), 0);
    assert_eq!(m.get_float("v2"), 0.0);
    assert!(!m.get_boolean("v3"));
    assert_eq!(m.get_float("v4"), -10.15);
    assert_eq!(m.current_state_name(), "foo");

    m.update();
    assert_eq!(m.current_state_name(), "foo");

    m.set_integer("v1", 42);
    m.update();
    assert_eq!(m.current_state_name(), "bar");

    m.set_float("v2", 100.0);
    m.set_boolean("v3", true);
    m.update();
    assert_eq!(m.current_state_name(), "bar");

    m.set_float("v2", 100.625);
    m.update();
    assert_eq!(m.current_state_name(), "plop");

    m.set_integer("v1", 30);
    m.set_boolean("v3", false);
    m.update();
    assert_eq!(m.current_state_name(), "foo");

    m.set_float("v2", -12.0);
    m.update();
    assert_eq!(m.current_state_name(), "toto");
}

fn addr(m: &Machine) -> *const Machine {
    m
}

#[test]
fn test_load_json_and_run() {
    let bp: Blueprint = SCENARIO.parse().unwrap();
    assert!(bp.validate().is_ok());
    assert!(bp.lint().is_empty());

    let mut m = builder().build_default().unwrap();
    run_scenario(&mut m);
}

#[test]
fn test_pooling() {
    let mut pool = Pool::new(&builder(), (), 2).unwrap();

    let m1 = pool.get();
    let m2 = pool.get();
    assert_eq!(pool.capacity(), 2);
    assert_ne!(addr(&pool[m1]), addr(&pool[m2]));
    let m1_addr = addr(&pool[m1]);
    let m2_addr = addr(&pool[m2]);

    run_scenario(&mut pool[m1]);
    run_scenario(&mut pool[m2]);

    pool.recycle(m1);
    let m3 = pool.get();
    assert_eq!(addr(&pool[m3]), m1_addr);
    assert_eq!(pool.capacity(), 2);

    // Recycling kept the previous occupant's variables.
    assert!(pool[m3].is_in("foo"));
    assert_eq!(pool[m3].get_integer("v1"), 30);
    assert_eq!(pool[m3].get_float("v2"), -12.0);

    pool[m3].reset_variables();
    run_scenario(&mut pool[m3]);

    pool.recycle(m2);
    let m4 = pool.get();
    assert_eq!(addr(&pool[m4]), m2_addr);
    assert_eq!(pool.capacity(), 2);

    pool[m4].reset_variables();
    run_scenario(&mut pool[m4]);

    let m5 = pool.get();
    let m6 = pool.get();
    assert_eq!(pool.capacity(), 4);

    run_scenario(&mut pool[m5]);
    run_scenario(&mut pool[m6]);

    // Growth never moved earlier machines.
    assert_eq!(addr(&pool[m3]), m1_addr);
    assert_eq!(addr(&pool[m4]), m2_addr);
}

#[test]
fn test_manual_variable_reset_matches_fresh_machine() {
    let mut pool = Pool::new(&builder(), (), 1).unwrap();
    let h = pool.get();
    run_scenario(&mut pool[h]);
    pool.recycle(h);

    let h = pool.get();
    pool[h].set_integer("v1", 0);
    pool[h].set_float("v2", 0.0);
    pool[h].set_boolean("v3", false);
    pool[h].set_float("v4", -10.15);
    run_scenario(&mut pool[h]);
}

#[test]
fn test_change_state_then_reset() {
    let mut m = builder().build_default().unwrap();
    m.change_state("toto");
    assert!(m.is_in("toto"));

    // toto has no outgoing transitions.
    assert!(!m.update());

    m.reset();
    assert!(m.is_in("foo"));
}

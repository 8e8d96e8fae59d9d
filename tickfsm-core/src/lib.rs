//! # tickfsm-core
//!
//! Tick-driven finite state machine runtime.
//!
//! This crate provides:
//! - An open-addressing name table for string-keyed lookups
//! - Typed variables and guard conditions with a consistent float policy
//! - Blueprints: declarative machine descriptions, loadable from JSON
//! - A builder resolving blueprints into index-linked machines
//! - Per-tick transition evaluation with enter/exit/update hooks
//! - Machine pools with free-list recycling

pub mod blueprint;
pub mod builder;
pub mod condition;
pub mod error;
pub mod machine;
pub mod name_table;
pub mod pool;
pub mod value;
pub mod variable;

pub use blueprint::{Blueprint, ConditionSpec, LintWarning, OperandSpec, StateSpec, TransitionSpec, VariableSpec};
pub use builder::{BuilderConfig, MachineBuilder, NameStorage};
pub use condition::{Condition, ConditionEvaluator, Operand};
pub use error::{CoreError, DefinitionError};
pub use machine::{Hook, Machine, State, StateHooks, StateId, Transition, TransitionId, UserData};
pub use name_table::{sdbm_hash, NameTable};
pub use pool::{Pool, PoolConfig, PoolHandle};
pub use value::{Comparator, Value, ValueType, FLOAT_EPSILON};
pub use variable::{VarId, Variable};

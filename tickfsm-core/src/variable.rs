//! Named, typed, mutable machine variables.

use crate::value::{Value, ValueType};
use std::fmt;
use std::sync::Arc;

/// Index of a variable inside its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A variable owned by a machine.
///
/// The type is fixed when the variable is created; every setter and getter
/// asserts it.
#[derive(Debug, Clone)]
pub struct Variable {
    name: Arc<str>,
    value: Value,
    initial: Value,
}

impl Variable {
    pub(crate) fn new(name: Arc<str>, initial: Value) -> Self {
        Self {
            name,
            value: initial,
            initial,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// The value this variable held when its machine was built.
    pub fn initial_value(&self) -> Value {
        self.initial
    }

    /// Replaces the value, keeping the type.
    ///
    /// # Panics
    ///
    /// Panics if `value` has a different type.
    pub fn set(&mut self, value: Value) {
        self.assert_type(value.value_type());
        self.value = value;
    }

    /// Restores the initial value.
    pub fn reset(&mut self) {
        self.value = self.initial;
    }

    pub fn integer(&self) -> i32 {
        match self.value {
            Value::Integer(i) => i,
            other => self.type_panic(ValueType::Integer, other.value_type()),
        }
    }

    pub fn float(&self) -> f32 {
        match self.value {
            Value::Float(f) => f,
            other => self.type_panic(ValueType::Float, other.value_type()),
        }
    }

    pub fn boolean(&self) -> bool {
        match self.value {
            Value::Boolean(b) => b,
            other => self.type_panic(ValueType::Boolean, other.value_type()),
        }
    }

    pub fn set_integer(&mut self, value: i32) {
        self.set(Value::Integer(value));
    }

    pub fn set_float(&mut self, value: f32) {
        self.set(Value::Float(value));
    }

    pub fn set_boolean(&mut self, value: bool) {
        self.set(Value::Boolean(value));
    }

    fn assert_type(&self, requested: ValueType) {
        let actual = self.value_type();
        if actual != requested {
            self.type_panic(requested, actual);
        }
    }

    fn type_panic(&self, requested: ValueType, actual: ValueType) -> ! {
        panic!(
            "variable '{}' is {}, not {}",
            self.name, actual, requested
        )
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {}", self.name, self.value_type(), self.value)
    }
}

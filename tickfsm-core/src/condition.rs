//! Guard condition evaluation.
//!
//! A condition compares one machine variable (the left operand) against
//! either a constant or a second variable. Operand types are checked when the
//! condition is built, so evaluation never meets a mismatch.
//!
//! A transition's conditions are combined with logical AND in declaration
//! order and evaluation stops at the first one that fails. An empty list
//! always matches.

use crate::value::{Comparator, Value};
use crate::variable::{VarId, Variable};

/// Right-hand side of a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// A constant fixed at build time.
    Constant(Value),
    /// Another variable of the same machine.
    Variable(VarId),
}

/// A single resolved guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    comparator: Comparator,
    left: VarId,
    right: Operand,
}

impl Condition {
    /// Creates a condition from already resolved operands.
    ///
    /// Type agreement is the caller's responsibility; `Machine::add_condition`
    /// is the checked entry point.
    pub(crate) fn new(comparator: Comparator, left: VarId, right: Operand) -> Self {
        Self {
            comparator,
            left,
            right,
        }
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn left(&self) -> VarId {
        self.left
    }

    pub fn right(&self) -> Operand {
        self.right
    }

    /// Evaluates the condition against the machine's variables.
    pub fn evaluate(&self, variables: &[Variable]) -> bool {
        let left = variables[self.left.index()].value();
        let right = match self.right {
            Operand::Constant(value) => value,
            Operand::Variable(id) => variables[id.index()].value(),
        };
        left.compare(self.comparator, &right)
    }
}

/// Evaluates condition lists.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluates a single condition.
    pub fn evaluate(condition: &Condition, variables: &[Variable]) -> bool {
        condition.evaluate(variables)
    }

    /// AND of all conditions, short-circuiting on the first failure.
    /// An empty list is true.
    pub fn evaluate_all(conditions: &[Condition], variables: &[Variable]) -> bool {
        conditions.iter().all(|c| c.evaluate(variables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn vars() -> Vec<Variable> {
        vec![
            Variable::new(Arc::from("v1"), Value::Integer(42)),
            Variable::new(Arc::from("v2"), Value::Float(-12.0)),
            Variable::new(Arc::from("v3"), Value::Boolean(true)),
            Variable::new(Arc::from("v4"), Value::Float(-10.15)),
        ]
    }

    #[test]
    fn test_constant_operand() {
        let vars = vars();
        let c = Condition::new(Comparator::Equal, VarId(0), Operand::Constant(Value::Integer(42)));
        assert!(c.evaluate(&vars));

        let c = Condition::new(Comparator::LessThan, VarId(0), Operand::Constant(Value::Integer(42)));
        assert!(!c.evaluate(&vars));
    }

    #[test]
    fn test_variable_operand() {
        let vars = vars();
        let c = Condition::new(Comparator::LessThan, VarId(1), Operand::Variable(VarId(3)));
        assert!(c.evaluate(&vars));

        let c = Condition::new(Comparator::GreaterThan, VarId(1), Operand::Variable(VarId(3)));
        assert!(!c.evaluate(&vars));
    }

    #[test]
    fn test_empty_list_matches() {
        assert!(ConditionEvaluator::evaluate_all(&[], &vars()));
    }

    #[test]
    fn test_and_semantics() {
        let vars = vars();
        let pass = Condition::new(Comparator::Equal, VarId(2), Operand::Constant(Value::Boolean(true)));
        let fail = Condition::new(Comparator::GreaterThan, VarId(1), Operand::Constant(Value::Float(100.0)));

        assert!(ConditionEvaluator::evaluate_all(&[pass, pass], &vars));
        assert!(!ConditionEvaluator::evaluate_all(&[pass, fail], &vars));
        assert!(!ConditionEvaluator::evaluate_all(&[fail, pass], &vars));
        assert!(ConditionEvaluator::evaluate(&pass, &vars));
    }

    #[test]
    fn test_short_circuits_on_first_failure() {
        let vars = vars();
        let fail = Condition::new(Comparator::NotEqual, VarId(0), Operand::Constant(Value::Integer(42)));
        // Would panic if evaluated: bool ordered against bool.
        let poisoned = Condition::new(Comparator::LessThan, VarId(2), Operand::Constant(Value::Boolean(false)));

        assert!(!ConditionEvaluator::evaluate_all(&[fail, poisoned], &vars));
    }
}

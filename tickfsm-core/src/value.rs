//! Typed scalar values and comparison operators.
//!
//! Floats compare with an absolute tolerance of [`FLOAT_EPSILON`]. Two floats
//! closer than the tolerance are *equal*, and neither orders before the
//! other. The ordering comparators are derived from that single equality, so
//! for any pair exactly one of `LessThan`, `Equal`, `GreaterThan` holds:
//!
//! | comparator       | float rule                  |
//! |------------------|-----------------------------|
//! | `Equal`          | `a == b || abs(a - b) < ε`  |
//! | `NotEqual`       | `!(a == b)`                 |
//! | `LessThan`       | `a < b && !(a == b)`        |
//! | `LessOrEqual`    | `a < b || (a == b)`         |
//! | `GreaterThan`    | `a > b && !(a == b)`        |
//! | `GreaterOrEqual` | `a > b || (a == b)`         |
//!
//! Equal infinities are equal. A NaN operand is equal to nothing and ordered against nothing: only
//! `NotEqual` holds.

use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for float equality.
pub const FLOAT_EPSILON: f32 = f32::EPSILON;

/// The type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "int", alias = "integer")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "bool", alias = "boolean")]
    Boolean,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "int",
            ValueType::Float => "float",
            ValueType::Boolean => "bool",
        }
    }

    /// The zero value of this type.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Integer => Value::Integer(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Boolean => Value::Boolean(false),
        }
    }

    /// Returns true if values of this type can be ordered.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, ValueType::Boolean)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged scalar.
///
/// Serialized as `{"type": "int", "value": 42}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[serde(rename = "int")]
    Integer(i32),
    #[serde(rename = "float")]
    Float(f32),
    #[serde(rename = "bool")]
    Boolean(bool),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Compares `self` against `other`.
    ///
    /// # Panics
    ///
    /// Panics if the operands have different types, or if an ordering
    /// comparator is applied to booleans.
    pub fn compare(&self, comparator: Comparator, other: &Value) -> bool {
        match (*self, *other) {
            (Value::Integer(a), Value::Integer(b)) => compare_integers(comparator, a, b),
            (Value::Float(a), Value::Float(b)) => compare_floats(comparator, a, b),
            (Value::Boolean(a), Value::Boolean(b)) => match comparator {
                Comparator::Equal => a == b,
                Comparator::NotEqual => a != b,
                _ => panic!("comparator '{}' cannot order booleans", comparator),
            },
            (a, b) => panic!(
                "cannot compare {} with {}",
                a.value_type(),
                b.value_type()
            ),
        }
    }

    /// Builds a value of type `ty` from a JSON literal.
    ///
    /// Integers accept any JSON integer within `i32` range; floats accept any
    /// JSON number within `f32` range.
    pub fn from_json(ty: ValueType, json: &serde_json::Value) -> Result<Self, String> {
        match ty {
            ValueType::Integer => json
                .as_i64()
                .ok_or_else(|| format!("expected an integer, got {}", json))
                .and_then(|n| {
                    i32::try_from(n).map_err(|_| format!("{} is out of range", n))
                })
                .map(Value::Integer),
            ValueType::Float => json
                .as_f64()
                .ok_or_else(|| format!("expected a number, got {}", json))
                .and_then(|f| {
                    let narrowed = f as f32;
                    if narrowed.is_infinite() {
                        Err(format!("{} is out of range", f))
                    } else {
                        Ok(Value::Float(narrowed))
                    }
                }),
            ValueType::Boolean => json
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| format!("expected a boolean, got {}", json)),
        }
    }

    /// Returns the bare JSON literal of this value.
    pub fn to_json(&self) -> serde_json::Value {
        match *self {
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Value::from(f as f64),
            Value::Boolean(b) => serde_json::Value::from(b),
        }
    }

    /// Parses a textual literal as type `ty` (`42`, `-1.5`, `true`).
    pub fn parse(ty: ValueType, text: &str) -> Result<Self, String> {
        let text = text.trim();
        match ty {
            ValueType::Integer => text
                .parse()
                .map(Value::Integer)
                .map_err(|e| format!("invalid int '{}': {}", text, e)),
            ValueType::Float => text
                .parse()
                .map(Value::Float)
                .map_err(|e| format!("invalid float '{}': {}", text, e)),
            ValueType::Boolean => text
                .parse()
                .map(Value::Boolean)
                .map_err(|e| format!("invalid bool '{}': {}", text, e)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "neq")]
    NotEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessOrEqual,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterOrEqual,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Equal,
        Comparator::NotEqual,
        Comparator::LessThan,
        Comparator::LessOrEqual,
        Comparator::GreaterThan,
        Comparator::GreaterOrEqual,
    ];

    /// Short name used in blueprints (`eq`, `lt`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equal => "eq",
            Comparator::NotEqual => "neq",
            Comparator::LessThan => "lt",
            Comparator::LessOrEqual => "lte",
            Comparator::GreaterThan => "gt",
            Comparator::GreaterOrEqual => "gte",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
            Comparator::LessThan => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterOrEqual => ">=",
        }
    }

    /// Returns true for `LessThan`, `LessOrEqual`, `GreaterThan`, `GreaterOrEqual`.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Comparator::Equal | Comparator::NotEqual)
    }

    /// Checks that this comparator can be applied to `left` and `right`.
    ///
    /// `variable` names the left operand in the returned error.
    pub fn check_operands(
        &self,
        variable: &str,
        left: ValueType,
        right: ValueType,
    ) -> Result<(), DefinitionError> {
        if left != right {
            return Err(DefinitionError::TypeMismatch {
                variable: variable.to_string(),
                expected: left,
                found: right,
            });
        }
        if self.is_ordering() && !left.is_ordered() {
            return Err(DefinitionError::UnorderedComparison {
                variable: variable.to_string(),
                comparator: *self,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::ALL
            .iter()
            .find(|c| c.as_str() == s || c.symbol() == s)
            .copied()
            .ok_or_else(|| format!("unknown comparator: '{}'", s))
    }
}

fn compare_integers(comparator: Comparator, a: i32, b: i32) -> bool {
    match comparator {
        Comparator::Equal => a == b,
        Comparator::NotEqual => a != b,
        Comparator::LessThan => a < b,
        Comparator::LessOrEqual => a <= b,
        Comparator::GreaterThan => a > b,
        Comparator::GreaterOrEqual => a >= b,
    }
}

/// Tolerant float equality. Equal infinities compare equal.
pub fn floats_equal(a: f32, b: f32) -> bool {
    a == b || (a - b).abs() < FLOAT_EPSILON
}

fn compare_floats(comparator: Comparator, a: f32, b: f32) -> bool {
    let equal = floats_equal(a, b);
    match comparator {
        Comparator::Equal => equal,
        Comparator::NotEqual => !equal,
        Comparator::LessThan => a < b && !equal,
        Comparator::LessOrEqual => a < b || equal,
        Comparator::GreaterThan => a > b && !equal,
        Comparator::GreaterOrEqual => a > b || equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_comparisons() {
        let a = Value::Integer(41);
        let b = Value::Integer(42);

        assert!(!a.compare(Comparator::Equal, &b));
        assert!(a.compare(Comparator::NotEqual, &b));
        assert!(a.compare(Comparator::LessThan, &b));
        assert!(a.compare(Comparator::LessOrEqual, &b));
        assert!(!a.compare(Comparator::GreaterThan, &b));
        assert!(!a.compare(Comparator::GreaterOrEqual, &b));

        assert!(b.compare(Comparator::Equal, &b));
        assert!(b.compare(Comparator::LessOrEqual, &b));
        assert!(b.compare(Comparator::GreaterOrEqual, &b));
        assert!(!b.compare(Comparator::LessThan, &b));
    }

    #[test]
    fn test_float_equality_tolerance() {
        let a = Value::Float(1.0);
        let within = Value::Float(1.0 + FLOAT_EPSILON / 2.0);
        let outside = Value::Float(1.0 + FLOAT_EPSILON * 4.0);

        assert!(Value::Float(0.1 + 0.2).compare(Comparator::Equal, &Value::Float(0.3)));
        assert!(a.compare(Comparator::Equal, &within));
        assert!(!a.compare(Comparator::NotEqual, &within));
        assert!(!a.compare(Comparator::Equal, &outside));
        assert!(a.compare(Comparator::NotEqual, &outside));
    }

    #[test]
    fn test_float_ordering_inside_tolerance() {
        // one ulp apart, and an ulp at 0.5 is smaller than the tolerance
        let a = 0.5f32;
        let b = f32::from_bits(a.to_bits() + 1);
        assert!(a < b);
        let (va, vb) = (Value::Float(a), Value::Float(b));

        assert!(va.compare(Comparator::Equal, &vb));
        assert!(!va.compare(Comparator::LessThan, &vb));
        assert!(!va.compare(Comparator::GreaterThan, &vb));
        assert!(!vb.compare(Comparator::LessThan, &va));
        assert!(!vb.compare(Comparator::GreaterThan, &va));
        assert!(va.compare(Comparator::LessOrEqual, &vb));
        assert!(va.compare(Comparator::GreaterOrEqual, &vb));
    }

    #[test]
    fn test_float_ordering_boundaries() {
        let hundred = Value::Float(100.0);

        assert!(!hundred.compare(Comparator::GreaterThan, &Value::Float(100.0)));
        assert!(hundred.compare(Comparator::GreaterOrEqual, &Value::Float(100.0)));
        assert!(Value::Float(100.625).compare(Comparator::GreaterThan, &hundred));
        assert!(Value::Float(-12.0).compare(Comparator::LessThan, &Value::Float(-10.15)));
        assert!(!Value::Float(-10.15).compare(Comparator::LessThan, &Value::Float(-10.15)));
    }

    #[test]
    fn test_float_trichotomy() {
        let samples = [
            f32::NEG_INFINITY,
            -2.5,
            -1.0,
            0.0,
            1e-9,
            0.3,
            1.0,
            1.0 + FLOAT_EPSILON,
            100.625,
            f32::MAX,
            f32::INFINITY,
        ];
        for &a in &samples {
            for &b in &samples {
                let (va, vb) = (Value::Float(a), Value::Float(b));
                let lt = va.compare(Comparator::LessThan, &vb);
                let eq = va.compare(Comparator::Equal, &vb);
                let gt = va.compare(Comparator::GreaterThan, &vb);
                assert_eq!(
                    [lt, eq, gt].iter().filter(|x| **x).count(),
                    1,
                    "{} vs {}",
                    a,
                    b
                );
                assert_eq!(va.compare(Comparator::LessOrEqual, &vb), lt || eq);
                assert_eq!(va.compare(Comparator::GreaterOrEqual, &vb), gt || eq);
                assert_eq!(va.compare(Comparator::NotEqual, &vb), !eq);
            }
        }
    }

    #[test]
    fn test_float_infinities() {
        let inf = Value::Float(f32::INFINITY);
        assert!(inf.compare(Comparator::Equal, &inf));
        assert!(inf.compare(Comparator::GreaterOrEqual, &inf));
        assert!(inf.compare(Comparator::LessOrEqual, &inf));
        assert!(!inf.compare(Comparator::NotEqual, &inf));
        assert!(inf.compare(Comparator::GreaterThan, &Value::Float(f32::MAX)));
    }

    #[test]
    fn test_float_nan() {
        let nan = Value::Float(f32::NAN);
        for comparator in Comparator::ALL {
            let expected = comparator == Comparator::NotEqual;
            assert_eq!(nan.compare(comparator, &Value::Float(1.0)), expected);
            assert_eq!(nan.compare(comparator, &nan), expected);
        }
    }

    #[test]
    fn test_boolean_equality() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        assert!(t.compare(Comparator::Equal, &t));
        assert!(t.compare(Comparator::NotEqual, &f));
        assert!(!f.compare(Comparator::Equal, &t));
    }

    #[test]
    #[should_panic(expected = "cannot order booleans")]
    fn test_boolean_ordering_panics() {
        Value::Boolean(true).compare(Comparator::LessThan, &Value::Boolean(false));
    }

    #[test]
    #[should_panic(expected = "cannot compare int with float")]
    fn test_mismatched_types_panic() {
        Value::Integer(1).compare(Comparator::Equal, &Value::Float(1.0));
    }

    #[test]
    #[should_panic(expected = "cannot compare int with float")]
    fn test_mismatched_not_equal_panics() {
        Value::Integer(1).compare(Comparator::NotEqual, &Value::Float(2.0));
    }

    #[test]
    fn test_check_operands() {
        assert!(Comparator::LessThan
            .check_operands("v", ValueType::Float, ValueType::Float)
            .is_ok());
        assert!(matches!(
            Comparator::Equal.check_operands("v", ValueType::Integer, ValueType::Boolean),
            Err(DefinitionError::TypeMismatch { .. })
        ));
        assert!(matches!(
            Comparator::GreaterOrEqual.check_operands(
                "v",
                ValueType::Boolean,
                ValueType::Boolean
            ),
            Err(DefinitionError::UnorderedComparison { .. })
        ));
    }

    #[test]
    fn test_value_serde_format() {
        let v: Value = serde_json::from_value(json!({"type": "int", "value": 42})).unwrap();
        assert_eq!(v, Value::Integer(42));

        let v: Value = serde_json::from_value(json!({"type": "float", "value": -10.5})).unwrap();
        assert_eq!(v, Value::Float(-10.5));

        assert_eq!(
            serde_json::to_value(Value::Boolean(true)).unwrap(),
            json!({"type": "bool", "value": true})
        );
    }

    #[test]
    fn test_from_json_literal() {
        assert_eq!(
            Value::from_json(ValueType::Float, &json!(100)).unwrap(),
            Value::Float(100.0)
        );
        assert_eq!(
            Value::from_json(ValueType::Integer, &json!(-3)).unwrap(),
            Value::Integer(-3)
        );
        assert!(Value::from_json(ValueType::Integer, &json!(1.5)).is_err());
        assert!(Value::from_json(ValueType::Integer, &json!(1u64 << 40)).is_err());
        assert!(Value::from_json(ValueType::Boolean, &json!(1)).is_err());
        assert!(Value::from_json(ValueType::Float, &json!(1e300)).is_err());
        assert!(Value::from_json(ValueType::Float, &json!(-3.5e38)).is_err());
        assert_eq!(
            Value::from_json(ValueType::Float, &json!(f32::MAX as f64)).unwrap(),
            Value::Float(f32::MAX)
        );
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::parse(ValueType::Integer, "42"), Ok(Value::Integer(42)));
        assert_eq!(Value::parse(ValueType::Float, " -12 "), Ok(Value::Float(-12.0)));
        assert_eq!(Value::parse(ValueType::Boolean, "true"), Ok(Value::Boolean(true)));
        assert!(Value::parse(ValueType::Integer, "4.2").is_err());
    }

    #[test]
    fn test_comparator_from_str() {
        assert_eq!("gte".parse::<Comparator>(), Ok(Comparator::GreaterOrEqual));
        assert_eq!("!=".parse::<Comparator>(), Ok(Comparator::NotEqual));
        assert!("~".parse::<Comparator>().is_err());
    }
}

//! Declarative machine descriptions.
//!
//! A blueprint is the parsed, unresolved form of a machine: names instead of
//! indices, literals instead of typed values. It is built programmatically or
//! loaded from JSON:
//!
//! ```json
//! {
//!   "variables": [
//!     {"name": "v1", "type": "int"},
//!     {"name": "v4", "type": "float", "value": -10.15}
//!   ],
//!   "states": [
//!     {"name": "foo", "is_initial": true},
//!     {"name": "bar"}
//!   ],
//!   "transitions": [
//!     {"from": "foo", "to": "bar", "conditions": [
//!       {"comparator": "eq", "left": "v1",
//!        "right": {"kind": "constant", "type": "int", "value": 42}}
//!     ]},
//!     {"from": ["bar", "plop"], "to": "foo"}
//!   ]
//! }
//! ```
//!
//! Nothing is checked while parsing beyond the JSON shape; name resolution
//! and type checks happen in [`Blueprint::validate`] and in the builder.

use crate::builder::{assemble, NameStorage};
use crate::error::{CoreError, DefinitionError};
use crate::machine::Machine;
use crate::name_table::DEFAULT_CAPACITY;
use crate::value::{Comparator, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A state declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: Arc<str>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_initial: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: Arc<str>,

    #[serde(rename = "type")]
    pub ty: ValueType,

    /// Initial value literal. Absent means the zero value of the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl VariableSpec {
    /// Types the initial value literal.
    pub fn initial_value(&self) -> Result<Value, DefinitionError> {
        match &self.value {
            None => Ok(self.ty.default_value()),
            Some(literal) => OperandSpec::constant_value(self.ty, literal, &self.name),
        }
    }
}

/// Right-hand side of a condition, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OperandSpec {
    Constant {
        #[serde(rename = "type")]
        ty: ValueType,
        value: serde_json::Value,
    },
    Variable { name: Arc<str> },
}

impl OperandSpec {
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        OperandSpec::Constant {
            ty: value.value_type(),
            value: value.to_json(),
        }
    }

    pub fn var(name: impl Into<Arc<str>>) -> Self {
        OperandSpec::Variable { name: name.into() }
    }

    /// Types a constant operand; `variable` names the left operand in errors.
    pub(crate) fn constant_value(
        ty: ValueType,
        literal: &serde_json::Value,
        variable: &str,
    ) -> Result<Value, DefinitionError> {
        Value::from_json(ty, literal).map_err(|reason| DefinitionError::InvalidLiteral {
            variable: variable.to_string(),
            expected: ty,
            reason,
        })
    }
}

impl From<Value> for OperandSpec {
    fn from(value: Value) -> Self {
        OperandSpec::constant(value)
    }
}

impl From<i32> for OperandSpec {
    fn from(value: i32) -> Self {
        OperandSpec::constant(value)
    }
}

impl From<f32> for OperandSpec {
    fn from(value: f32) -> Self {
        OperandSpec::constant(value)
    }
}

impl From<bool> for OperandSpec {
    fn from(value: bool) -> Self {
        OperandSpec::constant(value)
    }
}

impl fmt::Display for OperandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandSpec::Constant { value, .. } => write!(f, "{}", value),
            OperandSpec::Variable { name } => f.write_str(name),
        }
    }
}

/// A guard: `left <comparator> right`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub comparator: Comparator,
    pub left: Arc<str>,
    pub right: OperandSpec,
}

impl fmt::Display for ConditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.comparator.symbol(), self.right)
    }
}

/// A transition declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    /// Source state(s). Can be a single state or multiple.
    #[serde(alias = "source", deserialize_with = "deserialize_sources")]
    pub from: Vec<Arc<str>>,

    #[serde(alias = "target")]
    pub to: Arc<str>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionSpec>,
}

impl TransitionSpec {
    pub fn new(from: impl Into<Arc<str>>, to: impl Into<Arc<str>>) -> Self {
        Self {
            from: vec![from.into()],
            to: to.into(),
            conditions: Vec::new(),
        }
    }

    /// A transition leaving from each of `sources`.
    pub fn from_any<I, S>(sources: I, to: impl Into<Arc<str>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            from: sources.into_iter().map(Into::into).collect(),
            to: to.into(),
            conditions: Vec::new(),
        }
    }

    /// Adds a condition.
    pub fn when(
        mut self,
        left: impl Into<Arc<str>>,
        comparator: Comparator,
        right: impl Into<OperandSpec>,
    ) -> Self {
        self.conditions.push(ConditionSpec {
            comparator,
            left: left.into(),
            right: right.into(),
        });
        self
    }
}

fn deserialize_sources<'de, D>(deserializer: D) -> Result<Vec<Arc<str>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct SourcesVisitor;

    impl<'de> Visitor<'de> for SourcesVisitor {
        type Value = Vec<Arc<str>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a state name or array of state names")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![Arc::from(v)])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut sources = Vec::new();
            while let Some(s) = seq.next_element::<String>()? {
                sources.push(Arc::from(s));
            }
            Ok(sources)
        }
    }

    deserializer.deserialize_any(SourcesVisitor)
}

/// A complete machine description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub variables: Vec<VariableSpec>,

    #[serde(default)]
    pub states: Vec<StateSpec>,

    #[serde(default)]
    pub transitions: Vec<TransitionSpec>,
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a blueprint from a JSON tree.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CoreError> {
        Ok(Self::deserialize(json)?)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// crc32c of the canonical JSON encoding, as 8 hex digits.
    pub fn checksum(&self) -> Result<String, CoreError> {
        let json_bytes = serde_json::to_vec(self)?;
        Ok(format!("{:08x}", crc32c::crc32c(&json_bytes)))
    }

    // Programmatic construction.

    pub fn state(mut self, name: impl Into<Arc<str>>) -> Self {
        self.states.push(StateSpec {
            name: name.into(),
            is_initial: false,
        });
        self
    }

    pub fn initial_state(mut self, name: impl Into<Arc<str>>) -> Self {
        self.states.push(StateSpec {
            name: name.into(),
            is_initial: true,
        });
        self
    }

    pub fn variable(mut self, name: impl Into<Arc<str>>, ty: ValueType) -> Self {
        self.variables.push(VariableSpec {
            name: name.into(),
            ty,
            value: None,
        });
        self
    }

    pub fn variable_with(mut self, name: impl Into<Arc<str>>, initial: impl Into<Value>) -> Self {
        let initial = initial.into();
        self.variables.push(VariableSpec {
            name: name.into(),
            ty: initial.value_type(),
            value: Some(initial.to_json()),
        });
        self
    }

    pub fn transition(mut self, transition: TransitionSpec) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Name of the first state marked initial.
    pub fn initial_state_name(&self) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.is_initial)
            .map(|s| &*s.name)
    }

    /// Number of transitions after expanding multi-source entries.
    pub fn expanded_transition_count(&self) -> usize {
        self.transitions.iter().map(|t| t.from.len()).sum()
    }

    /// Runs every build-time check without keeping a machine.
    ///
    /// Reports all problems at once.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut scratch: Machine = Machine::with_table_capacity(DEFAULT_CAPACITY, ());
        let problems = assemble(self, &mut scratch, NameStorage::Shared);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidBlueprint(problems))
        }
    }

    /// Finds constructs that build but are probably mistakes.
    ///
    /// Names that do not resolve are skipped here; `validate` reports them.
    pub fn lint(&self) -> Vec<LintWarning> {
        let mut warnings = Vec::new();

        // Per-source edges in declaration order.
        let mut edges: HashMap<&str, Vec<&TransitionSpec>> = HashMap::new();
        for transition in &self.transitions {
            for source in &transition.from {
                edges.entry(&**source).or_default().push(transition);
            }
        }

        if let Some(initial) = self.initial_state_name() {
            let mut reachable = HashSet::from([initial]);
            let mut queue = VecDeque::from([initial]);
            while let Some(state) = queue.pop_front() {
                for transition in edges.get(state).into_iter().flatten() {
                    if reachable.insert(&*transition.to) {
                        queue.push_back(&*transition.to);
                    }
                }
            }

            for state in &self.states {
                if !reachable.contains(&*state.name) {
                    warnings.push(LintWarning::UnreachableState {
                        state: state.name.to_string(),
                    });
                }
            }
        }

        for state in &self.states {
            let Some(outgoing) = edges.get(&*state.name) else {
                continue;
            };

            if let Some(pos) = outgoing.iter().position(|t| t.conditions.is_empty()) {
                let blocker = outgoing[pos];
                if blocker.to == state.name {
                    warnings.push(LintWarning::SelfLoop {
                        state: state.name.to_string(),
                    });
                }
                for shadowed in &outgoing[pos + 1..] {
                    warnings.push(LintWarning::ShadowedTransition {
                        from: state.name.to_string(),
                        to: shadowed.to.to_string(),
                        shadowed_by: blocker.to.to_string(),
                    });
                }
            }
        }

        let mut read: HashSet<&str> = HashSet::new();
        for condition in self.transitions.iter().flat_map(|t| &t.conditions) {
            read.insert(&*condition.left);
            if let OperandSpec::Variable { name } = &condition.right {
                read.insert(&**name);
            }
        }
        for variable in &self.variables {
            if !read.contains(&*variable.name) {
                warnings.push(LintWarning::UnusedVariable {
                    variable: variable.name.to_string(),
                });
            }
        }

        warnings
    }
}

impl std::str::FromStr for Blueprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// A non-fatal finding of [`Blueprint::lint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintWarning {
    UnreachableState { state: String },
    ShadowedTransition {
        from: String,
        to: String,
        shadowed_by: String,
    },
    UnusedVariable { variable: String },
    SelfLoop { state: String },
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintWarning::UnreachableState { state } => {
                write!(f, "state '{}' is unreachable from the initial state", state)
            }
            LintWarning::ShadowedTransition {
                from,
                to,
                shadowed_by,
            } => write!(
                f,
                "transition {} -> {} is never taken: {} -> {} always matches first",
                from, to, from, shadowed_by
            ),
            LintWarning::UnusedVariable { variable } => {
                write!(f, "variable '{}' is not read by any condition", variable)
            }
            LintWarning::SelfLoop { state } => {
                write!(f, "state '{}' re-enters itself on every tick", state)
            }
        }
    }
}

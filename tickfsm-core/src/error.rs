//! Core error types.

use crate::value::{Comparator, ValueType};
use thiserror::Error;

/// A single structural problem in a machine definition.
///
/// These are contract violations: a blueprint that produces one of them must
/// never reach a running machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("unknown state: '{name}'")]
    UnknownState { name: String },

    #[error("unknown variable: '{name}'")]
    UnknownVariable { name: String },

    #[error("duplicate state: '{name}'")]
    DuplicateState { name: String },

    #[error("duplicate variable: '{name}'")]
    DuplicateVariable { name: String },

    #[error("no initial state")]
    MissingInitialState,

    #[error("multiple initial states: '{first}' and '{second}'")]
    MultipleInitialStates { first: String, second: String },

    #[error("type mismatch on '{variable}': expected {expected}, found {found}")]
    TypeMismatch {
        variable: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("comparator '{comparator}' cannot order boolean variable '{variable}'")]
    UnorderedComparison {
        variable: String,
        comparator: Comparator,
    },

    #[error("invalid {expected} literal for '{variable}': {reason}")]
    InvalidLiteral {
        variable: String,
        expected: ValueType,
        reason: String,
    },

    #[error("hooks registered for unknown state: '{name}'")]
    UnknownHookState { name: String },

    #[error("transition to '{to}' has no source state")]
    EmptySources { to: String },
}

/// Errors from building or loading machines.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid blueprint: {}", join_problems(.0))]
    InvalidBlueprint(Vec<DefinitionError>),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns every definition problem carried by this error.
    pub fn problems(&self) -> &[DefinitionError] {
        match self {
            CoreError::InvalidBlueprint(problems) => problems,
            CoreError::Definition(problem) => std::slice::from_ref(problem),
            CoreError::Json(_) => &[],
        }
    }

    /// Returns an error code suitable for tool output.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidBlueprint(_) => "INVALID_BLUEPRINT",
            CoreError::Definition(e) => e.error_code(),
            CoreError::Json(_) => "BAD_JSON",
        }
    }
}

impl DefinitionError {
    /// Returns an error code suitable for tool output.
    pub fn error_code(&self) -> &'static str {
        match self {
            DefinitionError::UnknownState { .. } => "UNKNOWN_STATE",
            DefinitionError::UnknownVariable { .. } => "UNKNOWN_VARIABLE",
            DefinitionError::DuplicateState { .. } => "DUPLICATE_STATE",
            DefinitionError::DuplicateVariable { .. } => "DUPLICATE_VARIABLE",
            DefinitionError::MissingInitialState => "MISSING_INITIAL",
            DefinitionError::MultipleInitialStates { .. } => "MULTIPLE_INITIAL",
            DefinitionError::TypeMismatch { .. } => "TYPE_MISMATCH",
            DefinitionError::UnorderedComparison { .. } => "TYPE_MISMATCH",
            DefinitionError::InvalidLiteral { .. } => "BAD_LITERAL",
            DefinitionError::UnknownHookState { .. } => "UNKNOWN_STATE",
            DefinitionError::EmptySources { .. } => "EMPTY_SOURCES",
        }
    }
}

fn join_problems(problems: &[DefinitionError]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

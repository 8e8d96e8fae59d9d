//! The resolved machine graph and its tick algorithm.
//!
//! States and variables live in dense arrays owned by the machine; every
//! cross reference (transition target, condition operand) is an index into
//! those arrays, resolved once when the graph is constructed. Name lookups go
//! through two [`NameTable`]s.
//!
//! One call to [`Machine::update`]:
//!
//! 1. walks the current state's transitions in declaration order, taking the
//!    first whose conditions all hold (an empty condition list always holds);
//! 2. if one was taken: runs the old state's `on_exit`, makes the target
//!    current, runs the target's `on_enter`;
//! 3. runs `on_update` of whichever state is now current, exactly once.

use crate::blueprint::OperandSpec;
use crate::condition::{Condition, ConditionEvaluator, Operand};
use crate::error::DefinitionError;
use crate::name_table::{NameTable, DEFAULT_CAPACITY};
use crate::value::{Comparator, Value, ValueType};
use crate::variable::{VarId, Variable};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Index of a state inside its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position of a transition: its source state and declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionId {
    pub state: StateId,
    pub index: usize,
}

/// A state callback. Receives the machine and the id of the state the hook
/// belongs to.
pub type Hook<C = ()> = fn(&mut Machine<C>, StateId);

/// Opaque per-state data shared by every machine built from one builder.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Optional callbacks of a state.
pub struct StateHooks<C = ()> {
    pub on_enter: Option<Hook<C>>,
    pub on_exit: Option<Hook<C>>,
    pub on_update: Option<Hook<C>>,
}

impl<C> StateHooks<C> {
    pub fn new() -> Self {
        Self {
            on_enter: None,
            on_exit: None,
            on_update: None,
        }
    }

    pub fn on_enter(mut self, hook: Hook<C>) -> Self {
        self.on_enter = Some(hook);
        self
    }

    pub fn on_exit(mut self, hook: Hook<C>) -> Self {
        self.on_exit = Some(hook);
        self
    }

    pub fn on_update(mut self, hook: Hook<C>) -> Self {
        self.on_update = Some(hook);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_enter.is_none() && self.on_exit.is_none() && self.on_update.is_none()
    }
}

impl<C> Default for StateHooks<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for StateHooks<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for StateHooks<C> {}

impl<C> fmt::Debug for StateHooks<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHooks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .field("on_update", &self.on_update.is_some())
            .finish()
    }
}

/// An outgoing edge of a state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    target: StateId,
    conditions: Vec<Condition>,
}

impl Transition {
    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// A transition without conditions always matches.
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, variables: &[Variable]) -> bool {
        ConditionEvaluator::evaluate_all(&self.conditions, variables)
    }
}

/// A state and its outgoing transitions.
pub struct State<C = ()> {
    name: Arc<str>,
    transitions: Vec<Transition>,
    hooks: StateHooks<C>,
    user_data: Option<UserData>,
}

impl<C> State<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn hooks(&self) -> &StateHooks<C> {
        &self.hooks
    }

    /// Returns the state's user data if it is a `T`.
    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.as_deref()?.downcast_ref()
    }

    /// The name's shared allocation. Machines built with
    /// [`NameStorage::Shared`](crate::NameStorage) point into the blueprint.
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }
}

impl<C> Clone for State<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transitions: self.transitions.clone(),
            hooks: self.hooks,
            user_data: self.user_data.clone(),
        }
    }
}

impl<C> fmt::Debug for State<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("transitions", &self.transitions)
            .field("hooks", &self.hooks)
            .field("has_user_data", &self.user_data.is_some())
            .finish()
    }
}

/// A runnable state machine.
///
/// `C` is the machine's context: caller data that hooks can read and write.
pub struct Machine<C = ()> {
    states: Vec<State<C>>,
    state_index: NameTable<StateId>,
    variables: Vec<Variable>,
    variable_index: NameTable<VarId>,
    initial: Option<StateId>,
    current: Option<StateId>,
    context: C,
}

impl<C: Default> Machine<C> {
    /// Creates an empty machine with a default context.
    pub fn new() -> Self {
        Self::with_context(C::default())
    }
}

impl<C: Default> Default for Machine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Machine<C> {
    /// Creates an empty machine carrying `context`.
    pub fn with_context(context: C) -> Self {
        Self::with_table_capacity(DEFAULT_CAPACITY, context)
    }

    /// Creates an empty machine whose name tables start with `capacity` slots.
    pub fn with_table_capacity(capacity: usize, context: C) -> Self {
        Self {
            states: Vec::new(),
            state_index: NameTable::with_capacity(capacity),
            variables: Vec::new(),
            variable_index: NameTable::with_capacity(capacity),
            initial: None,
            current: None,
            context,
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Adds a state. The first state added with `is_initial` becomes both the
    /// initial and the current state.
    pub fn add_state(
        &mut self,
        name: impl Into<Arc<str>>,
        is_initial: bool,
    ) -> Result<StateId, DefinitionError> {
        let name = name.into();

        if self.state_index.contains_key(&name) {
            return Err(DefinitionError::DuplicateState {
                name: name.to_string(),
            });
        }
        if is_initial {
            if let Some(initial) = self.initial {
                return Err(DefinitionError::MultipleInitialStates {
                    first: self.states[initial.index()].name.to_string(),
                    second: name.to_string(),
                });
            }
        }

        let id = StateId(self.states.len() as u32);
        self.state_index.insert(name.clone(), id);
        self.states.push(State {
            name,
            transitions: Vec::new(),
            hooks: StateHooks::new(),
            user_data: None,
        });

        if is_initial {
            self.initial = Some(id);
            self.current = Some(id);
        }

        Ok(id)
    }

    /// Adds a variable holding the zero value of `ty`.
    pub fn add_variable(
        &mut self,
        name: impl Into<Arc<str>>,
        ty: ValueType,
    ) -> Result<VarId, DefinitionError> {
        self.add_variable_with(name, ty.default_value())
    }

    /// Adds a variable holding `initial`; its type is the type of `initial`.
    pub fn add_variable_with(
        &mut self,
        name: impl Into<Arc<str>>,
        initial: Value,
    ) -> Result<VarId, DefinitionError> {
        let name = name.into();

        if self.variable_index.contains_key(&name) {
            return Err(DefinitionError::DuplicateVariable {
                name: name.to_string(),
            });
        }

        let id = VarId(self.variables.len() as u32);
        self.variable_index.insert(name.clone(), id);
        self.variables.push(Variable::new(name, initial));
        Ok(id)
    }

    /// Adds an unconditional transition; conditions are attached with
    /// [`Machine::add_condition`].
    pub fn add_transition(&mut self, from: &str, to: &str) -> Result<TransitionId, DefinitionError> {
        let source = self.resolve_state(from)?;
        let target = self.resolve_state(to)?;

        let transitions = &mut self.states[source.index()].transitions;
        transitions.push(Transition {
            target,
            conditions: Vec::new(),
        });

        Ok(TransitionId {
            state: source,
            index: transitions.len() - 1,
        })
    }

    /// Resolves and type-checks a condition without attaching it.
    pub fn resolve_condition(
        &self,
        left: &str,
        comparator: Comparator,
        right: &OperandSpec,
    ) -> Result<Condition, DefinitionError> {
        let left_id = self.resolve_variable(left)?;
        let left_type = self.variables[left_id.index()].value_type();

        let (operand, right_type) = match right {
            OperandSpec::Constant { ty, value } => {
                let value = OperandSpec::constant_value(*ty, value, left)?;
                (Operand::Constant(value), *ty)
            }
            OperandSpec::Variable { name } => {
                let id = self.resolve_variable(name)?;
                (Operand::Variable(id), self.variables[id.index()].value_type())
            }
        };

        comparator.check_operands(left, left_type, right_type)?;
        Ok(Condition::new(comparator, left_id, operand))
    }

    /// Appends a condition to a transition.
    ///
    /// Fails if a name does not resolve or the operand types disagree.
    pub fn add_condition(
        &mut self,
        transition: TransitionId,
        left: &str,
        comparator: Comparator,
        right: impl Into<OperandSpec>,
    ) -> Result<(), DefinitionError> {
        let condition = self.resolve_condition(left, comparator, &right.into())?;
        self.push_condition(transition, condition);
        Ok(())
    }

    pub(crate) fn push_condition(&mut self, transition: TransitionId, condition: Condition) {
        self.states[transition.state.index()].transitions[transition.index]
            .conditions
            .push(condition);
    }

    /// Installs the callbacks of a state.
    pub fn set_hooks(&mut self, state: &str, hooks: StateHooks<C>) -> Result<(), DefinitionError> {
        let id = self.resolve_hook_state(state)?;
        self.states[id.index()].hooks = hooks;
        Ok(())
    }

    /// Attaches opaque data to a state.
    pub fn set_user_data(&mut self, state: &str, data: UserData) -> Result<(), DefinitionError> {
        let id = self.resolve_hook_state(state)?;
        self.states[id.index()].user_data = Some(data);
        Ok(())
    }

    fn resolve_state(&self, name: &str) -> Result<StateId, DefinitionError> {
        self.state_id(name)
            .ok_or_else(|| DefinitionError::UnknownState {
                name: name.to_string(),
            })
    }

    fn resolve_hook_state(&self, name: &str) -> Result<StateId, DefinitionError> {
        self.state_id(name)
            .ok_or_else(|| DefinitionError::UnknownHookState {
                name: name.to_string(),
            })
    }

    fn resolve_variable(&self, name: &str) -> Result<VarId, DefinitionError> {
        self.variable_id(name)
            .ok_or_else(|| DefinitionError::UnknownVariable {
                name: name.to_string(),
            })
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Evaluates one tick. Returns true if a transition was taken.
    ///
    /// # Panics
    ///
    /// Panics if the machine has no initial state.
    pub fn update(&mut self) -> bool {
        let current = self.current();
        let target = self.states[current.index()]
            .transitions
            .iter()
            .find(|t| t.matches(&self.variables))
            .map(|t| t.target);

        if let Some(target) = target {
            self.enter(target);
        }

        let current = self.current();
        if let Some(on_update) = self.states[current.index()].hooks.on_update {
            on_update(self, current);
        }

        target.is_some()
    }

    /// Forces a transition to `name`, ignoring guards: exit, switch, enter.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a state of this machine.
    pub fn change_state(&mut self, name: &str) {
        let id = self
            .state_id(name)
            .unwrap_or_else(|| panic!("unknown state: '{}'", name));
        self.change_state_to(id);
    }

    pub fn change_state_to(&mut self, id: StateId) {
        assert!(id.index() < self.states.len(), "state id out of range");
        self.enter(id);
    }

    fn enter(&mut self, target: StateId) {
        let previous = self.current();

        if let Some(on_exit) = self.states[previous.index()].hooks.on_exit {
            on_exit(self, previous);
        }

        self.current = Some(target);
        tracing::trace!(
            "transition {} -> {}",
            self.states[previous.index()].name,
            self.states[target.index()].name
        );

        if let Some(on_enter) = self.states[target.index()].hooks.on_enter {
            on_enter(self, target);
        }
    }

    /// Makes the initial state current again. Runs no hooks and leaves
    /// variables untouched.
    pub fn reset(&mut self) {
        self.current = Some(self.initial());
    }

    /// Restores every variable to the value it was built with.
    pub fn reset_variables(&mut self) {
        for variable in &mut self.variables {
            variable.reset();
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// # Panics
    ///
    /// Panics if the machine has no initial state.
    pub fn current(&self) -> StateId {
        self.current
            .unwrap_or_else(|| panic!("machine has no initial state"))
    }

    /// # Panics
    ///
    /// Panics if the machine has no initial state.
    pub fn initial(&self) -> StateId {
        self.initial
            .unwrap_or_else(|| panic!("machine has no initial state"))
    }

    pub fn has_initial(&self) -> bool {
        self.initial.is_some()
    }

    pub fn current_state(&self) -> &State<C> {
        &self.states[self.current().index()]
    }

    pub fn current_state_name(&self) -> &str {
        self.current_state().name()
    }

    /// Returns true if the current state is named `name`.
    pub fn is_in(&self, name: &str) -> bool {
        self.current
            .map(|id| &*self.states[id.index()].name == name)
            .unwrap_or(false)
    }

    pub fn state(&self, id: StateId) -> &State<C> {
        &self.states[id.index()]
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.state_index.get(name).copied()
    }

    pub fn states(&self) -> &[State<C>] {
        &self.states
    }

    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    // =========================================================================
    // Variables
    // =========================================================================

    pub fn variable_id(&self, name: &str) -> Option<VarId> {
        self.variable_index.get(name).copied()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variable_id(name).map(|id| &self.variables[id.index()])
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let id = self.variable_id(name)?;
        Some(&mut self.variables[id.index()])
    }

    pub fn variable_at(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn variable_at_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.index()]
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// # Panics
    ///
    /// Panics if `name` is unknown or holds another type; the same holds for
    /// every typed accessor below.
    pub fn get_integer(&self, name: &str) -> i32 {
        self.expect_variable(name).integer()
    }

    pub fn get_float(&self, name: &str) -> f32 {
        self.expect_variable(name).float()
    }

    pub fn get_boolean(&self, name: &str) -> bool {
        self.expect_variable(name).boolean()
    }

    pub fn set_integer(&mut self, name: &str, value: i32) {
        self.expect_variable_mut(name).set_integer(value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.expect_variable_mut(name).set_float(value);
    }

    pub fn set_boolean(&mut self, name: &str, value: bool) {
        self.expect_variable_mut(name).set_boolean(value);
    }

    pub fn set_value(&mut self, name: &str, value: Value) {
        self.expect_variable_mut(name).set(value);
    }

    fn expect_variable(&self, name: &str) -> &Variable {
        self.variable(name)
            .unwrap_or_else(|| panic!("unknown variable: '{}'", name))
    }

    fn expect_variable_mut(&mut self, name: &str) -> &mut Variable {
        self.variable_mut(name)
            .unwrap_or_else(|| panic!("unknown variable: '{}'", name))
    }
}

impl<C: Clone> Clone for Machine<C> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            state_index: self.state_index.clone(),
            variables: self.variables.clone(),
            variable_index: self.variable_index.clone(),
            initial: self.initial,
            current: self.current,
            context: self.context.clone(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("states", &self.states)
            .field("variables", &self.variables)
            .field("initial", &self.initial)
            .field("current", &self.current)
            .field("context", &self.context)
            .finish()
    }
}

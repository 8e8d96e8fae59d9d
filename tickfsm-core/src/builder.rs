//! Turns blueprints into runnable machines.
//!
//! A [`MachineBuilder`] holds a shared [`Blueprint`] plus the hooks and user
//! data registered per state name. Every [`MachineBuilder::build`] resolves
//! the blueprint from scratch into a fresh [`Machine`]: states first, then
//! variables, then transitions and their conditions. A build that finds any
//! problem fails with all of them.

use crate::blueprint::Blueprint;
use crate::error::{CoreError, DefinitionError};
use crate::machine::{Hook, Machine, StateHooks, UserData};
use crate::name_table::{NameTable, DEFAULT_CAPACITY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a machine's name strings live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameStorage {
    /// Reuse the blueprint's name allocations (reference counted, read-only).
    #[default]
    Shared,
    /// Copy every name into an allocation owned by the machine.
    Owned,
}

impl NameStorage {
    fn name(self, name: &Arc<str>) -> Arc<str> {
        match self {
            NameStorage::Shared => Arc::clone(name),
            NameStorage::Owned => Arc::from(&**name),
        }
    }
}

/// Builder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Initial slot count of each machine's name tables.
    pub table_capacity: usize,
    pub name_storage: NameStorage,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            table_capacity: DEFAULT_CAPACITY,
            name_storage: NameStorage::Shared,
        }
    }
}

/// Produces machines from one blueprint.
pub struct MachineBuilder<C = ()> {
    blueprint: Arc<Blueprint>,
    config: BuilderConfig,
    hooks: NameTable<StateHooks<C>>,
    user_data: NameTable<UserData>,
}

impl<C> MachineBuilder<C> {
    pub fn new(blueprint: impl Into<Arc<Blueprint>>) -> Self {
        Self::with_config(blueprint, BuilderConfig::default())
    }

    pub fn with_config(blueprint: impl Into<Arc<Blueprint>>, config: BuilderConfig) -> Self {
        Self {
            blueprint: blueprint.into(),
            config,
            hooks: NameTable::with_capacity(16),
            user_data: NameTable::with_capacity(16),
        }
    }

    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Sets all hooks of `state`, replacing earlier registrations.
    pub fn hooks(mut self, state: &str, hooks: StateHooks<C>) -> Self {
        self.hooks.insert(state, hooks);
        self
    }

    pub fn on_enter(self, state: &str, hook: Hook<C>) -> Self {
        self.update_hooks(state, |h| h.on_enter = Some(hook))
    }

    pub fn on_exit(self, state: &str, hook: Hook<C>) -> Self {
        self.update_hooks(state, |h| h.on_exit = Some(hook))
    }

    pub fn on_update(self, state: &str, hook: Hook<C>) -> Self {
        self.update_hooks(state, |h| h.on_update = Some(hook))
    }

    /// Attaches opaque data to `state` in every machine this builder makes.
    pub fn user_data(mut self, state: &str, data: UserData) -> Self {
        self.user_data.insert(state, data);
        self
    }

    fn update_hooks(mut self, state: &str, f: impl FnOnce(&mut StateHooks<C>)) -> Self {
        let mut hooks = self.hooks.get(state).copied().unwrap_or_default();
        f(&mut hooks);
        self.hooks.insert(state, hooks);
        self
    }

    /// Builds a machine carrying `context`.
    pub fn build(&self, context: C) -> Result<Machine<C>, CoreError> {
        let mut machine = Machine::with_table_capacity(self.config.table_capacity, context);
        let mut problems = assemble(&self.blueprint, &mut machine, self.config.name_storage);

        for (state, hooks) in self.hooks.iter() {
            if let Err(e) = machine.set_hooks(state, *hooks) {
                problems.push(e);
            }
        }
        for (state, data) in self.user_data.iter() {
            if let Err(e) = machine.set_user_data(state, Arc::clone(data)) {
                problems.push(e);
            }
        }

        if !problems.is_empty() {
            return Err(CoreError::InvalidBlueprint(problems));
        }

        tracing::debug!(
            "built machine: {} states, {} variables, {} transitions",
            machine.states().len(),
            machine.variables().len(),
            machine.transition_count()
        );

        Ok(machine)
    }
}

impl<C: Default> MachineBuilder<C> {
    /// Builds a machine with a default context.
    pub fn build_default(&self) -> Result<Machine<C>, CoreError> {
        self.build(C::default())
    }
}

impl<C> Clone for MachineBuilder<C> {
    fn clone(&self) -> Self {
        Self {
            blueprint: Arc::clone(&self.blueprint),
            config: self.config.clone(),
            hooks: self.hooks.clone(),
            user_data: self.user_data.clone(),
        }
    }
}

/// Resolves `blueprint` into `machine`, returning every problem found.
///
/// Keeps going after errors so one pass reports as much as possible. A
/// variable whose initial literal is bad is still declared (with the zero
/// value) so conditions reading it resolve.
pub(crate) fn assemble<C>(
    blueprint: &Blueprint,
    machine: &mut Machine<C>,
    storage: NameStorage,
) -> Vec<DefinitionError> {
    let mut problems = Vec::new();

    for state in &blueprint.states {
        if let Err(e) = machine.add_state(storage.name(&state.name), state.is_initial) {
            problems.push(e);
        }
    }
    if !machine.has_initial() {
        problems.push(DefinitionError::MissingInitialState);
    }

    for variable in &blueprint.variables {
        let initial = variable.initial_value().unwrap_or_else(|e| {
            problems.push(e);
            variable.ty.default_value()
        });
        if let Err(e) = machine.add_variable_with(storage.name(&variable.name), initial) {
            problems.push(e);
        }
    }

    for transition in &blueprint.transitions {
        let mut conditions = Vec::with_capacity(transition.conditions.len());
        for spec in &transition.conditions {
            match machine.resolve_condition(&spec.left, spec.comparator, &spec.right) {
                Ok(condition) => conditions.push(condition),
                Err(e) => problems.push(e),
            }
        }

        let target_known = machine.state_id(&transition.to).is_some();
        if !target_known {
            problems.push(DefinitionError::UnknownState {
                name: transition.to.to_string(),
            });
        }

        if transition.from.is_empty() {
            problems.push(DefinitionError::EmptySources {
                to: transition.to.to_string(),
            });
        }

        for source in &transition.from {
            if machine.state_id(source).is_none() {
                problems.push(DefinitionError::UnknownState {
                    name: source.to_string(),
                });
                continue;
            }
            if !target_known {
                continue;
            }
            match machine.add_transition(source, &transition.to) {
                Ok(id) => {
                    for condition in &conditions {
                        machine.push_condition(id, *condition);
                    }
                }
                Err(e) => problems.push(e),
            }
        }
    }

    problems
}

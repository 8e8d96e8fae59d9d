//! Tick scripts.
//!
//! One command per line; blank lines and `#` comments are skipped:
//!
//! ```text
//! set v1 42        # assign a variable (parsed by the variable's type)
//! tick 3           # run Update three times (default 1)
//! change bar       # forced transition, runs exit/enter hooks
//! reset            # back to the initial state, variables untouched
//! expect bar       # fail unless the current state is `bar`
//! print            # show the current state and every variable
//! ```

use colored::Colorize;
use thiserror::Error;
use tickfsm_core::{Machine, Value};

/// A parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { variable: String, value: String },
    Tick(u64),
    Change(String),
    Reset,
    Expect(String),
    Print,
}

impl Command {
    /// Parses one line. Returns `Ok(None)` for blank and comment lines.
    pub fn parse(line: &str) -> Result<Option<Self>, ScriptError> {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((cmd, args)) = parts.split_first() else {
            return Ok(None);
        };

        let command = match (cmd.to_lowercase().as_str(), args) {
            ("set", [variable, value]) => Command::Set {
                variable: variable.to_string(),
                value: value.to_string(),
            },
            ("tick", []) => Command::Tick(1),
            ("tick", [n]) => Command::Tick(
                n.parse()
                    .map_err(|_| ScriptError::Syntax(format!("invalid tick count '{}'", n)))?,
            ),
            ("change", [state]) => Command::Change(state.to_string()),
            ("reset", []) => Command::Reset,
            ("expect", [state]) => Command::Expect(state.to_string()),
            ("print", []) => Command::Print,
            ("set", _) => return Err(ScriptError::Syntax("usage: set <variable> <value>".into())),
            ("tick", _) => return Err(ScriptError::Syntax("usage: tick [count]".into())),
            ("change", _) => return Err(ScriptError::Syntax("usage: change <state>".into())),
            ("expect", _) => return Err(ScriptError::Syntax("usage: expect <state>".into())),
            ("reset", _) | ("print", _) => {
                return Err(ScriptError::Syntax(format!("'{}' takes no arguments", cmd)))
            }
            (other, _) => return Err(ScriptError::Syntax(format!("unknown command '{}'", other))),
        };

        Ok(Some(command))
    }
}

/// Script failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("{0}")]
    BadValue(String),

    #[error("expected state '{expected}', machine is in '{actual}'")]
    ExpectFailed { expected: String, actual: String },

    #[error("tick limit of {0} reached")]
    TickLimit(u64),
}

/// A machine driven by script commands.
pub struct Session {
    machine: Machine,
    ticks: u64,
    max_ticks: u64,
}

impl Session {
    pub fn new(machine: Machine, max_ticks: u64) -> Self {
        Self {
            machine,
            ticks: 0,
            max_ticks,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Parses and runs one line; returns the text to print.
    pub fn run_line(&mut self, line: &str) -> Result<Option<String>, ScriptError> {
        match Command::parse(line)? {
            Some(command) => self.run(&command).map(Some),
            None => Ok(None),
        }
    }

    /// Runs one command; returns the text to print.
    pub fn run(&mut self, command: &Command) -> Result<String, ScriptError> {
        match command {
            Command::Set { variable, value } => {
                let ty = self
                    .machine
                    .variable(variable)
                    .map(|v| v.value_type())
                    .ok_or_else(|| ScriptError::UnknownVariable(variable.clone()))?;
                let value = Value::parse(ty, value).map_err(ScriptError::BadValue)?;
                self.machine.set_value(variable, value);
                Ok(format!("{} = {}", variable.cyan(), value))
            }

            Command::Tick(n) => {
                let mut lines = Vec::new();
                for _ in 0..*n {
                    if self.ticks >= self.max_ticks {
                        return Err(ScriptError::TickLimit(self.max_ticks));
                    }
                    self.ticks += 1;
                    let moved = self.machine.update();
                    lines.push(self.tick_line(moved));
                }
                Ok(lines.join("\n"))
            }

            Command::Change(state) => {
                if self.machine.state_id(state).is_none() {
                    return Err(ScriptError::UnknownState(state.clone()));
                }
                self.machine.change_state(state);
                Ok(format!("{} {}", "changed to".green(), state.yellow()))
            }

            Command::Reset => {
                self.machine.reset();
                Ok(format!(
                    "{} {}",
                    "reset to".green(),
                    self.machine.current_state_name().yellow()
                ))
            }

            Command::Expect(state) => {
                if self.machine.is_in(state) {
                    Ok(format!("{} {}", "ok".green(), state))
                } else {
                    Err(ScriptError::ExpectFailed {
                        expected: state.clone(),
                        actual: self.machine.current_state_name().to_string(),
                    })
                }
            }

            Command::Print => Ok(describe(&self.machine)),
        }
    }

    fn tick_line(&self, moved: bool) -> String {
        let marker = if moved { "->".green() } else { "==".dimmed() };
        format!(
            "[{}] {} {}",
            self.ticks.to_string().cyan(),
            marker,
            self.machine.current_state_name().yellow()
        )
    }
}

/// Current state plus every variable, one per line.
pub fn describe(machine: &Machine) -> String {
    let mut output = format!("state: {}", machine.current_state_name().yellow());
    for variable in machine.variables() {
        output.push_str(&format!("\n  {}", variable));
    }
    output
}

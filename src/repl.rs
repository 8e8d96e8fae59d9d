//! Interactive REPL.

use crate::config::Config;
use crate::script::{describe, Session};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tickfsm_core::{Blueprint, MachineBuilder};

const HELP_TEXT: &str = r#"
Available commands:
  help                    Show this help

  set <variable> <value>  Assign a variable
  tick [count]            Run Update once (or count times)
  change <state>          Force a transition (runs exit/enter hooks)
  reset                   Return to the initial state (variables untouched)
  expect <state>          Check the current state
  print                   Show the current state and variables

  quit, exit              Exit the REPL
"#;

pub fn run(blueprint: Blueprint, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let builder: MachineBuilder = MachineBuilder::with_config(blueprint, config.builder.clone());
    let mut session = Session::new(builder.build_default()?, config.simulate.max_ticks);

    println!("{}", "tickfsm REPL".bold().cyan());
    println!("{}", describe(session.machine()));

    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".tickfsm_history"))
        .unwrap_or_else(|_| ".tickfsm_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", format!("{}>", session.machine().current_state_name()).cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match line.to_lowercase().as_str() {
                    "help" | "?" => {
                        println!("{}", HELP_TEXT);
                        continue;
                    }
                    "quit" | "exit" | "q" => break,
                    _ => {}
                }

                match session.run_line(line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => {}
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    println!("{}", format!("{} tick(s) run.", session.ticks()).dimmed());

    Ok(())
}

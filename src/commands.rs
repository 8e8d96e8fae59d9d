//! Command execution.

use crate::config::Config;
use crate::script::{describe, Session};
use crate::Commands;
use colored::Colorize;
use std::io::Read;
use std::path::Path;
use tickfsm_core::{Blueprint, MachineBuilder, Pool};

/// Executes a one-shot command and returns the formatted output.
pub fn execute(cmd: Commands, config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => unreachable!(),

        Commands::Lint { blueprint } => {
            let bp = load_blueprint(&blueprint)?;
            lint(&bp)
        }

        Commands::Inspect { blueprint } => {
            let bp = load_blueprint(&blueprint)?;
            inspect(&bp)
        }

        Commands::Simulate { blueprint, script } => {
            let bp = load_blueprint(&blueprint)?;
            let text = read_script(&script)?;
            simulate(bp, &text, config)
        }

        Commands::PoolDemo { blueprint, count } => {
            let bp = load_blueprint(&blueprint)?;
            pool_demo(bp, count, config)
        }
    }
}

/// Reads a blueprint from a JSON file.
pub fn load_blueprint(path: &Path) -> Result<Blueprint, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let bp: Blueprint = content.parse()?;
    tracing::debug!("loaded blueprint from {}", path.display());
    Ok(bp)
}

fn read_script(source: &str) -> Result<String, Box<dyn std::error::Error>> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| format!("failed to read script '{}': {}", source, e).into())
    }
}

fn lint(bp: &Blueprint) -> Result<String, Box<dyn std::error::Error>> {
    let mut output = String::new();

    let warnings = bp.lint();
    for warning in &warnings {
        output.push_str(&format!("{}: {}\n", "warning".yellow(), warning));
    }

    if let Err(e) = bp.validate() {
        for problem in e.problems() {
            output.push_str(&format!(
                "{} [{}]: {}\n",
                "error".red(),
                problem.error_code(),
                problem
            ));
        }
        eprint!("{}", output);
        return Err(format!("{} problem(s) found", e.problems().len()).into());
    }

    output.push_str(&format!(
        "{} ({} warning(s))",
        "Blueprint OK".green(),
        warnings.len()
    ));
    Ok(output)
}

fn inspect(bp: &Blueprint) -> Result<String, Box<dyn std::error::Error>> {
    let mut output = format!("{} {}\n", "Blueprint".bold(), bp.checksum()?.dimmed());

    output.push_str(&format!("{}\n", "States:".bold()));
    for state in &bp.states {
        let marker = if state.is_initial { " (initial)".green().to_string() } else { String::new() };
        output.push_str(&format!("  {}{}\n", state.name.cyan(), marker));
    }

    output.push_str(&format!("{}\n", "Variables:".bold()));
    for variable in &bp.variables {
        let initial = variable
            .initial_value()
            .map(|v| v.to_string())
            .unwrap_or_else(|e| e.to_string().red().to_string());
        output.push_str(&format!(
            "  {}: {} = {}\n",
            variable.name.cyan(),
            variable.ty,
            initial
        ));
    }

    output.push_str(&format!("{}\n", "Transitions:".bold()));
    for transition in &bp.transitions {
        let guard = if transition.conditions.is_empty() {
            "always".dimmed().to_string()
        } else {
            transition
                .conditions
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" && ")
        };
        let sources = transition
            .from
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!(
            "  {} -> {} [{}]\n",
            sources,
            transition.to.yellow(),
            guard
        ));
    }

    Ok(output.trim_end().to_string())
}

fn simulate(bp: Blueprint, script: &str, config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    let builder: MachineBuilder = MachineBuilder::with_config(bp, config.builder.clone());
    let mut session = Session::new(builder.build_default()?, config.simulate.max_ticks);

    let mut output = Vec::new();
    for (number, line) in script.lines().enumerate() {
        match session.run_line(line) {
            Ok(Some(text)) => output.push(text),
            Ok(None) => {}
            Err(e) => {
                eprintln!("{}", output.join("\n"));
                return Err(format!("line {}: {}", number + 1, e).into());
            }
        }
    }

    output.push(format!(
        "{} after {} tick(s)\n{}",
        "Finished".green(),
        session.ticks(),
        describe(session.machine())
    ));
    Ok(output.join("\n"))
}

fn pool_demo(bp: Blueprint, count: usize, config: &Config) -> Result<String, Box<dyn std::error::Error>> {
    let builder: MachineBuilder = MachineBuilder::with_config(bp, config.builder.clone());
    let mut pool = Pool::with_config(&builder, (), &config.pool)?;

    let handles: Vec<_> = (0..count).map(|_| pool.get()).collect();
    let after_get = (pool.capacity(), pool.in_use());

    let moved = pool.update_all();

    for handle in handles {
        pool.recycle(handle);
    }

    let reused = (0..count).map(|_| pool.get()).count();

    Ok(format!(
        "{}\n  checked out: {} (capacity {})\n  transitioned on first tick: {}\n  recycled and reused: {}\n  capacity: {}  in use: {}  free: {}  high water: {}",
        "Pool demo".bold(),
        after_get.1,
        after_get.0,
        moved,
        reused,
        pool.capacity(),
        pool.in_use(),
        pool.free_len(),
        pool.high_water()
    ))
}

//! tickfsm - Command-line tool for tick-driven state machines
//!
//! Lints and inspects blueprints, runs tick scripts, and hosts a REPL.

mod commands;
mod config;
mod repl;
mod script;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tickfsm")]
#[command(about = "Tick-driven finite state machines: lint, inspect, simulate")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "TICKFSM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a blueprint and report lint warnings
    Lint {
        /// Blueprint JSON file
        blueprint: PathBuf,
    },

    /// Print states, variables, transitions and checksum
    Inspect {
        /// Blueprint JSON file
        blueprint: PathBuf,
    },

    /// Run a tick script against a fresh machine
    Simulate {
        /// Blueprint JSON file
        blueprint: PathBuf,

        /// Script file, or - for stdin
        #[arg(short, long, default_value = "-")]
        script: String,
    },

    /// Drive a machine interactively
    Repl {
        /// Blueprint JSON file
        blueprint: PathBuf,
    },

    /// Check out machines from a pool, tick, recycle, and print statistics
    PoolDemo {
        /// Blueprint JSON file
        blueprint: PathBuf,

        /// Machines to check out
        #[arg(short = 'n', long, default_value = "32")]
        count: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Commands::Repl { blueprint } => {
            let bp = commands::load_blueprint(&blueprint)?;
            if let Err(e) = repl::run(bp, &config) {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        cmd => match commands::execute(cmd, &config) {
            Ok(output) => {
                println!("{}", output);
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

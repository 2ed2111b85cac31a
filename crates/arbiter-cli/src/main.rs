//! # arbiter-cli
//!
//! Command-line interface for arbiter designs.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize candidates, conflicts and scheduling order
//! arbiter report design.toml
//!
//! # Export the conflict graph for Graphviz
//! arbiter graph design.toml | dot -Tsvg > conflicts.svg
//!
//! # Check every assignment of the 1-bit inputs
//! arbiter check design.toml
//!
//! # Evaluate one cycle
//! arbiter simulate design.toml --set ra=1 --set data=0x2a
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod design_file;
mod error;
mod output;

pub use design_file::DesignFile;
pub use error::CliError;
pub use output::Output;

/// Arbiter CLI
#[derive(Parser, Debug)]
#[command(name = "arbiter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Elaborate a design and summarize the result
    Report {
        /// Design file
        file: PathBuf,
    },
    /// Print the conflict graph in Graphviz format
    Graph {
        /// Design file
        file: PathBuf,
    },
    /// Exhaustively check the scheduling guarantees
    Check {
        /// Design file
        file: PathBuf,
    },
    /// Evaluate one cycle
    Simulate {
        /// Design file
        file: PathBuf,
        /// Input assignment, NAME=VALUE
        #[arg(long = "set", value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = run(cli.command, cli.json);

    if let Err(e) = result {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "error": e.to_string(),
                    "success": false
                })
            );
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(command: Commands, json: bool) -> Result<(), CliError> {
    match command {
        Commands::Report { file } => commands::report::execute(&load(&file)?, json),
        Commands::Graph { file } => commands::graph::execute(&load(&file)?, json),
        Commands::Check { file } => commands::check::execute(&load(&file)?, json),
        Commands::Simulate { file, assignments } => {
            commands::simulate::execute(&load(&file)?, &assignments, json)
        }
    }
}

fn load(path: &std::path::Path) -> Result<arbiter_scheduler::Design, CliError> {
    let design = DesignFile::load(path)?.elaborate()?;
    tracing::info!(
        "Elaborated {} units into {} candidates",
        design.units().len(),
        design.graph().len()
    );
    Ok(design)
}

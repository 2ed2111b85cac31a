//! CLI error types

use arbiter_scheduler::logic::LogicError;
use arbiter_scheduler::ElaborationError;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Design file refers to something it never declares
    #[error("Invalid design: {0}")]
    InvalidDesign(String),

    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Elaboration failed
    #[error("Elaboration failed: {0}")]
    Elaboration(#[from] ElaborationError),

    /// Netlist construction failed
    #[error("Logic error: {0}")]
    Logic(#[from] LogicError),

    /// Exhaustive check found broken guarantees
    #[error("{0} violations found")]
    Violations(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Design file parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

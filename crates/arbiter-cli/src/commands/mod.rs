//! Subcommand implementations

pub mod check;
pub mod graph;
pub mod report;
pub mod simulate;

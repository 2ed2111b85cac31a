//! Elaboration summary

use arbiter_scheduler::Design;
use serde_json::Value;

use crate::{output::Output, CliError};

/// Print the elaboration report
pub fn execute(design: &Design, json: bool) -> Result<(), CliError> {
    let report = design.report();
    let stats = &report.stats;

    let mut text = format!(
        "Scheduler: {}\nUnits: {} ({} transactions, {} methods)\nCalls: {}\nCandidates: {}\nConflicts: {}\nPriorities: {}\nNetlist nodes: {}",
        report.scheduler,
        stats.units,
        stats.transactions,
        stats.methods,
        stats.calls,
        stats.candidates,
        stats.conflicts,
        stats.priorities,
        stats.netlist_nodes,
    );
    text.push_str(&format!("\nOrder: {}", report.order.join(", ")));
    for diagnostic in design.diagnostics() {
        text.push_str(&format!("\nwarning: {}", diagnostic));
    }

    let value: Value = serde_json::to_value(&report)?;
    let mut out = Output::new(json).message(&text);
    if let Value::Object(fields) = value {
        for (key, field) in fields {
            out = out.field_value(&key, field);
        }
    }
    out.print();
    Ok(())
}

//! Conflict graph export

use arbiter_scheduler::Design;

use crate::{output::Output, CliError};

/// Print the conflict graph in Graphviz format
pub fn execute(design: &Design, json: bool) -> Result<(), CliError> {
    let dot = design.to_dot();
    Output::new(json)
        .field("dot", &dot)
        .field_u64("candidates", design.graph().len() as u64)
        .message(dot.trim_end())
        .print();
    Ok(())
}

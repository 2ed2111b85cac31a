//! Single-cycle evaluation

use arbiter_scheduler::logic::{mask, Inputs};
use arbiter_scheduler::{Design, UnitKind};
use serde_json::{Map, Value};

use crate::{output::Output, CliError};

/// Parse a `NAME=VALUE` assignment
pub fn parse_assignment(text: &str) -> Result<(String, u64), CliError> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| CliError::InvalidInput(format!("expected NAME=VALUE, got '{}'", text)))?;
    let value = value.trim();
    let parsed = match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    }
    .map_err(|_| CliError::InvalidInput(format!("invalid value '{}' for '{}'", value, name)))?;
    Ok((name.trim().to_string(), parsed))
}

/// Evaluate one cycle and print running units and method arguments
pub fn execute(design: &Design, assignments: &[String], json: bool) -> Result<(), CliError> {
    let mut inputs = Inputs::new();
    for text in assignments {
        let (name, value) = parse_assignment(text)?;
        let node = design
            .netlist()
            .find_input(&name)
            .ok_or_else(|| CliError::InvalidInput(format!("unknown input '{}'", name)))?;
        let width = design.netlist().width(node)?;
        if value > mask(width) {
            return Err(CliError::InvalidInput(format!(
                "value {} does not fit in {}-bit input '{}'",
                value, width, name
            )));
        }
        inputs.set(node, value);
    }

    let eval = design.evaluate(&inputs)?;
    let running: Vec<String> = design
        .units()
        .iter()
        .filter(|u| eval.bit(u.run))
        .map(|u| u.qualified_name.clone())
        .collect();

    let mut data_in = Map::new();
    let mut text = if running.is_empty() {
        "Running: -".to_string()
    } else {
        format!("Running: {}", running.join(", "))
    };
    let called = design
        .units()
        .iter()
        .filter(|u| u.kind == UnitKind::Method && eval.bit(u.run));
    for method in called {
        if method.data_in.is_empty() {
            continue;
        }
        let mut fields = Map::new();
        for (field, value) in method.data_in.layout().fields().iter().zip(eval.fields(&method.data_in)) {
            fields.insert(field.name.clone(), Value::from(value));
            text.push_str(&format!("\n{}.{} = {}", method.qualified_name, field.name, value));
        }
        data_in.insert(method.qualified_name.clone(), Value::Object(fields));
    }

    Output::new(json)
        .field_value("running", serde_json::to_value(&running)?)
        .field_value("data_in", Value::Object(data_in))
        .message(&text)
        .print();
    Ok(())
}

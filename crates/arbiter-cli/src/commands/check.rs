//! Exhaustive property check

use arbiter_scheduler::{Design, Verifier};

use crate::{output::Output, CliError};

/// Check every assignment of the design's 1-bit inputs
///
/// Fails with [`CliError::Violations`] after printing when anything breaks.
pub fn execute(design: &Design, json: bool) -> Result<(), CliError> {
    let report = Verifier::new(design)?.run()?;

    let mut text = format!(
        "Checked {} assignments over {} inputs",
        report.assignments,
        report.inputs.len()
    );
    if report.is_clean() {
        text.push_str("\nAll scheduling guarantees hold");
    }
    for violation in &report.violations {
        text.push_str(&format!("\nviolation: {}", violation));
    }

    Output::new(json)
        .field_value("inputs", serde_json::to_value(&report.inputs)?)
        .field_u64("assignments", report.assignments)
        .field_value("violations", serde_json::to_value(&report.violations)?)
        .field_bool("clean", report.is_clean())
        .message(&text)
        .print();

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Violations(report.violations.len()))
    }
}

//! CLI integration tests for arbiter-cli
//!
//! Tests command parsing, design loading and output formatting.

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

/// Helper to run the CLI with arguments
fn run_arbiter(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_arbiter"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Write a design to a temporary file
fn design_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const CHAIN: &str = r#"
[[inputs]]
name = "ra"

[[inputs]]
name = "rb"

[[inputs]]
name = "rc"

[[transactions]]
name = "A"
request = "ra"

[[transactions]]
name = "B"
request = "rb"

[[transactions]]
name = "C"
request = "rc"

[[conflicts]]
a = "A"
b = "B"

[[conflicts]]
a = "B"
b = "C"
"#;

const SHARED: &str = r#"
[[inputs]]
name = "rx"

[[inputs]]
name = "ry"

[[inputs]]
name = "ax"
width = 8

[[inputs]]
name = "ay"
width = 8

[[transactions]]
name = "X"
request = "rx"

[[transactions]]
name = "Y"
request = "ry"

[[methods]]
name = "M"
input = [{ name = "data", width = 8 }]

[[calls]]
caller = "X"
callee = "M"
args = { data = "ax" }

[[calls]]
caller = "Y"
callee = "M"
args = { data = "ay" }

[[conflicts]]
a = "X"
b = "Y"
priority = "left"
"#;

// ==================== Help & Version Tests ====================

#[test]
fn test_cli_help() {
    let output = run_arbiter(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("arbiter"));
    assert!(stdout.contains("report"));
    assert!(stdout.contains("graph"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("simulate"));
}

#[test]
fn test_cli_version() {
    let output = run_arbiter(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("arbiter"));
}

// ==================== Report Tests ====================

#[test]
fn test_report() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&["report", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scheduler: eager"));
    assert!(stdout.contains("Units: 3 (3 transactions, 0 methods)"));
    assert!(stdout.contains("Order: A, B, C"));
}

#[test]
fn test_report_json() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&["--json", "report", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["scheduler"], "eager");
    assert_eq!(json["stats"]["conflicts"], 2);
    assert_eq!(json["order"], serde_json::json!(["A", "B", "C"]));
}

#[test]
fn test_report_missing_file() {
    let output = run_arbiter(&["report", "/nonexistent/design.toml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("IO error"));
}

#[test]
fn test_report_elaboration_error_json() {
    let file = design_file(
        r#"
        [[transactions]]
        name = "A"

        [[transactions]]
        name = "A"
        "#,
    );
    let output = run_arbiter(&["--json", "report", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("duplicate unit 'A'"));
}

// ==================== Graph Tests ====================

#[test]
fn test_graph_dot() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&["graph", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph conflicts {"));
    assert!(stdout.contains("[dir=none, color=red]"));
}

// ==================== Check Tests ====================

#[test]
fn test_check_clean() {
    let file = design_file(SHARED);
    let output = run_arbiter(&["check", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Checked 4 assignments over 2 inputs"));
    assert!(stdout.contains("All scheduling guarantees hold"));
}

#[test]
fn test_check_json() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&["--json", "check", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["clean"], true);
    assert_eq!(json["assignments"], 8);
}

// ==================== Simulate Tests ====================

#[test]
fn test_simulate_chain() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&[
        "simulate",
        file.path().to_str().unwrap(),
        "--set",
        "ra=1",
        "--set",
        "rb=1",
        "--set",
        "rc=1",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Running: A, C"));
}

#[test]
fn test_simulate_shared_method_json() {
    let file = design_file(SHARED);
    let output = run_arbiter(&[
        "--json",
        "simulate",
        file.path().to_str().unwrap(),
        "--set",
        "rx=1",
        "--set",
        "ry=1",
        "--set",
        "ax=7",
        "--set",
        "ay=9",
    ]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["running"], serde_json::json!(["X", "M"]));
    assert_eq!(json["data_in"]["M"]["data"], 7);
}

#[test]
fn test_simulate_unknown_input() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&["simulate", file.path().to_str().unwrap(), "--set", "nope=1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown input 'nope'"));
}

// ==================== Value Range Tests ====================

#[test]
fn test_oversized_request_constant_rejected() {
    let file = design_file(
        r#"
        [[transactions]]
        name = "T"
        request = 2
        "#,
    );
    let output = run_arbiter(&["simulate", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("constant 2 does not fit in 1 bits"));
}

#[test]
fn test_validate_bound_above_range_accepts_every_value() {
    let file = design_file(
        r#"
        [[transactions]]
        name = "U"

        [[methods]]
        name = "put"
        input = [{ name = "v", width = 8 }]
        validate = { field = "v", below = 256 }

        [[calls]]
        caller = "U"
        callee = "put"
        args = { v = 5 }
        "#,
    );
    let output = run_arbiter(&["--json", "simulate", file.path().to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["running"], serde_json::json!(["U", "put"]));
    assert_eq!(json["data_in"]["put"]["v"], 5);
}

#[test]
fn test_simulate_oversized_value_rejected() {
    let file = design_file(CHAIN);
    let output = run_arbiter(&["simulate", file.path().to_str().unwrap(), "--set", "ra=2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("value 2 does not fit in 1-bit input 'ra'"));
}

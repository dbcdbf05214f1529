//! # Messages
//!
//! Contains format functions for the text handed back to the decision engine
//! as tool results, and for operator-facing reports.

use std::time::Duration;

// Containment

pub fn outside_root(action: &str, path: &str) -> String {
    format!("Cannot {action} \"{path}\" as it is outside the permitted working directory")
}

// File reading

pub fn not_a_regular_file(path: &str) -> String {
    format!("File not found or is not a regular file: \"{path}\"")
}

pub fn read_failed(path: &str, err: &str) -> String {
    format!("Failed to read \"{path}\": {err}")
}

// Directory listing

pub fn not_a_directory(path: &str) -> String {
    format!("\"{path}\" is not a directory")
}

pub fn list_failed(path: &str, err: &str) -> String {
    format!("Failed to list \"{path}\": {err}")
}

pub fn directory_entry(name: &str, size: u64, is_dir: bool) -> String {
    format!("- {name}: file_size={size} bytes, is_dir={is_dir}")
}

// File writing

pub fn target_is_directory(path: &str) -> String {
    format!("\"{path}\" is a directory, not a file")
}

pub fn create_directory_failed(path: &str, err: &str) -> String {
    format!("Error creating directory for \"{path}\": {err}")
}

pub fn write_permission_denied(path: &str) -> String {
    format!("Permission denied writing to \"{path}\"")
}

pub fn write_filesystem_error(path: &str, err: &str) -> String {
    format!("File system error writing to \"{path}\": {err}")
}

pub fn write_failed(path: &str, err: &str) -> String {
    format!("Error writing to \"{path}\": {err}")
}

pub fn write_succeeded(path: &str, chars: usize) -> String {
    format!("Successfully wrote to \"{path}\" ({chars} characters written)")
}

pub fn write_attributed(path: &str, created: bool, chars: usize, lines: usize, delta: usize) -> String {
    let action = if created { "created" } else { "modified" };
    format!(
        "Successfully {action} \"{path}\" with line-by-line AI attribution ({chars} characters, {lines} lines, {delta} lines changed)"
    )
}

// Script execution

pub fn script_not_found(path: &str) -> String {
    format!("File \"{path}\" not found.")
}

pub fn not_an_allowed_script(path: &str, allowed: &[String]) -> String {
    format!(
        "\"{path}\" is not an executable script (allowed extensions: {})",
        allowed.join(", ")
    )
}

pub fn execution_timed_out(limit: Duration) -> String {
    format!("Script execution timed out after {} seconds", limit.as_secs_f64())
}

pub fn execution_failed(err: &str) -> String {
    format!("Error executing script: {err}")
}

pub fn exited_with_code(code: i32) -> String {
    format!("Process exited with code {code}")
}

pub const TERMINATED_BY_SIGNAL: &str = "Process was terminated by a signal";
pub const NO_OUTPUT: &str = "No output produced.";

// Dispatch

pub fn unknown_tool(name: &str) -> String {
    format!("Unknown function: {name}")
}

pub fn invalid_arguments(tool: &str, err: &str) -> String {
    format!("Invalid arguments for {tool}: {err}")
}

// Loop outcome

pub fn max_rounds_reached(rounds: usize) -> String {
    format!("Incomplete: stopped after reaching the maximum of {rounds} iterations without a final answer")
}

pub fn engine_failure(err: &str) -> String {
    format!("Decision engine failure: {err}")
}

pub fn protocol_violation(detail: &str) -> String {
    format!("Protocol violation: {detail}")
}

//! Audit strategies: the closed set of verification predicates available to
//! the Auditor.
//!
//! Pure, synchronous filesystem and string checks. No network, no shell.
//! The dispatch table is a hardcoded match so the LLM can only ever select
//! from this finite set.

use serde_json::Value;
use std::path::Path;

use maestro_core::types::AuditResult;

pub fn verify_file_exists(path: &str) -> AuditResult {
    if Path::new(path).exists() {
        AuditResult::pass(format!("File '{}' exists.", path))
    } else {
        AuditResult::fail(format!("File '{}' NOT found.", path))
    }
}

pub fn verify_file_content_contains(path: &str, substring: &str) -> AuditResult {
    if !Path::new(path).exists() {
        return AuditResult::fail(format!("File '{}' does not exist.", path));
    }
    match std::fs::read_to_string(path) {
        Ok(content) if content.contains(substring) => {
            AuditResult::pass(format!("File '{}' contains expected text.", path))
        }
        Ok(content) => {
            let preview: String = content.chars().take(50).collect();
            AuditResult::fail(format!(
                "File '{}' content mismatch. Found: '{}'",
                path, preview
            ))
        }
        Err(e) => AuditResult::fail(format!("Error reading file '{}': {}", path, e)),
    }
}

pub fn verify_file_does_not_exist(path: &str) -> AuditResult {
    if !Path::new(path).exists() {
        AuditResult::pass(format!("File '{}' correctly does not exist.", path))
    } else {
        AuditResult::fail(format!("File '{}' exists but should not.", path))
    }
}

pub fn verify_tool_output_success(previous_output: &str) -> AuditResult {
    let lower = previous_output.to_lowercase();
    if lower.contains("error") || lower.contains("exception") || lower.contains("failed") {
        AuditResult::fail(format!(
            "Previous step reported error: {}",
            previous_output
        ))
    } else {
        AuditResult::pass("Previous step executed successfully.")
    }
}

/// Names the Auditor prompt offers to the LLM.
pub const STRATEGY_SIGNATURES: [&str; 4] = [
    "verify_file_exists(path)",
    "verify_file_content_contains(path, substring)",
    "verify_file_does_not_exist(path)",
    "verify_tool_output_success()",
];

/// Dispatch an LLM-selected strategy name. Unknown names fall back to the
/// generic output check over the previous step's output.
pub fn dispatch(strategy: &str, args: &Value, previous_output: &str) -> AuditResult {
    let arg = |name: &str| args.get(name).and_then(|v| v.as_str()).unwrap_or_default();

    match strategy {
        "verify_file_exists" => verify_file_exists(arg("path")),
        "verify_file_content_contains" => {
            verify_file_content_contains(arg("path"), arg("substring"))
        }
        "verify_file_does_not_exist" => verify_file_does_not_exist(arg("path")),
        "verify_tool_output_success" => verify_tool_output_success(previous_output),
        unknown => {
            tracing::warn!(strategy = unknown, "unknown audit strategy; using output check");
            verify_tool_output_success(previous_output)
        }
    }
}

use serde::{Deserialize, Serialize};

/// How loudly an audit outcome should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Outcome of one audit strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub passed: bool,
    pub message: String,
    pub severity: Severity,
}

impl AuditResult {
    /// A passing result (severity `Info`).
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            severity: Severity::Info,
        }
    }

    /// A failing result (severity `Error`).
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

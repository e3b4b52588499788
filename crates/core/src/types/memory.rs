use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// WARM tier (activity log)
// =============================================================================

/// Classification of a WARM log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    ToolUse,
    Thought,
    UserFeedback,
    Error,
    System,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::ToolUse => "TOOL_USE",
            EntryType::Thought => "THOUGHT",
            EntryType::UserFeedback => "USER_FEEDBACK",
            EntryType::Error => "ERROR",
            EntryType::System => "SYSTEM",
        }
    }

    /// Parse a loose label, falling back to `System` for anything unknown.
    pub fn from_label(label: &str) -> Self {
        match label {
            "TOOL_USE" => EntryType::ToolUse,
            "THOUGHT" => EntryType::Thought,
            "USER_FEEDBACK" => EntryType::UserFeedback,
            "ERROR" => EntryType::Error,
            _ => EntryType::System,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Facts store
// =============================================================================

/// Grouping for a stored user fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCategory {
    General,
    Preference,
    Personal,
    Config,
}

impl FactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::General => "general",
            FactCategory::Preference => "preference",
            FactCategory::Personal => "personal",
            FactCategory::Config => "config",
        }
    }
}

/// A key/value fact persisted per agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFact {
    pub key: String,
    pub value: String,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// COLD tier (vector store)
// =============================================================================

/// One record in the COLD tier. `metadata` is a flattened JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: String,
}

/// A COLD record scored against a query vector.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: MemoryRecord,
    /// Cosine distance to the query (0.0 is identical).
    pub distance: f32,
}

/// A recalled memory as handed to callers: parsed metadata, not raw JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RecalledMemory {
    pub content: String,
    pub metadata: Value,
    pub distance: f32,
}

use serde::{Deserialize, Serialize};

/// The classifier's verdict on what the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentType {
    /// The user wants something done: plan and execute.
    Task,
    /// A question answerable directly, without side effects.
    Question,
    /// Greeting or small talk.
    Chat,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::Task => "TASK",
            IntentType::Question => "QUESTION",
            IntentType::Chat => "CHAT",
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_wire_format() {
        let parsed: IntentType = serde_json::from_str("\"QUESTION\"").unwrap();
        assert_eq!(parsed, IntentType::Question);
        assert_eq!(serde_json::to_string(&IntentType::Task).unwrap(), "\"TASK\"");
    }
}

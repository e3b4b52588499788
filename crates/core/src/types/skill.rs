use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared shape of one skill parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Loose type tag ("str", "int", "dict", ...). Documentation, not enforced.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    /// Default value. Required parameters must not carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
}

/// A worked input/output example attached to a skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillExample {
    #[serde(default)]
    pub input: Map<String, Value>,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub description: String,
}

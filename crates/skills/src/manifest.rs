//! Skill manifest parsing.
//!
//! Two formats share one metadata shape: `SKILL.md` files carry YAML
//! front-matter between `---` delimiters followed by a markdown body, and
//! single-file skills are bare `<name>.yaml` documents.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use maestro_core::types::{ParameterSpec, SkillExample};

/// Declared skill metadata. `name` and `description` are required; the rest
/// defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillManifest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub returns: Value,
    #[serde(default)]
    pub examples: Vec<SkillExample>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Parse a `SKILL.md` document into its manifest and markdown body.
pub fn parse_skill_md(content: &str) -> Result<(SkillManifest, String)> {
    let Some(rest) = content.strip_prefix("---") else {
        bail!("SKILL.md does not start with a front-matter delimiter");
    };
    let Some((front_matter, body)) = rest.split_once("\n---") else {
        bail!("SKILL.md front-matter is not closed");
    };

    let manifest: SkillManifest =
        serde_yaml::from_str(front_matter).context("invalid SKILL.md front-matter")?;
    Ok((manifest, body.trim().to_string()))
}

/// Load a single-file `<name>.yaml` skill manifest.
pub fn load_single_file(path: &Path) -> Result<SkillManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read skill file {:?}", path))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("invalid skill manifest in {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"---
name: file-operations
description: Create, read, append and delete files
category: filesystem
version: 1.2.0
tags: [files, io]
parameters:
  operation:
    type: str
    required: true
    description: One of write, read, append, delete
  path:
    type: str
    required: true
    description: Target file path
  content:
    type: str
    description: Content for write and append
---

# File operations

Use this skill whenever the plan needs to touch the filesystem.
"#;

    #[test]
    fn test_parse_front_matter_and_body() {
        let (manifest, body) = parse_skill_md(SAMPLE).unwrap();
        assert_eq!(manifest.name, "file-operations");
        assert_eq!(manifest.category.as_deref(), Some("filesystem"));
        assert_eq!(manifest.parameters.len(), 3);
        assert!(manifest.parameters["operation"].required);
        assert!(!manifest.parameters["content"].required);
        assert!(body.starts_with("# File operations"));
    }

    #[test]
    fn test_missing_delimiter_is_an_error() {
        assert!(parse_skill_md("name: no-front-matter\n").is_err());
        assert!(parse_skill_md("---\nname: unclosed\n").is_err());
    }

    #[test]
    fn test_name_and_description_are_required() {
        let no_description = "---\nname: lonely\n---\nbody";
        assert!(parse_skill_md(no_description).is_err());
    }
}

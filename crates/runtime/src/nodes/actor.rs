//! Action node: executes the current plan step.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use maestro_core::{
    error::{Error, Result},
    types::StepRole,
};

use crate::graph::GraphNode;
use crate::nodes::NodeContext;
use crate::state::{ExecutionState, StateUpdate};

/// Executes Actor steps. Preferred path: the instruction names a registered
/// skill after a verb cue (`use` / `execute` / `run`) and the registry is
/// invoked. Fallback path (feature-gated, config-gated): ask the tool model
/// for a shell snippet and run it. Whatever happens lands in
/// `tool_outputs["step_{i}"]` and the cursor advances by one.
pub struct Actor {
    ctx: NodeContext,
    skill_cue: Regex,
}

impl Actor {
    pub fn new(ctx: NodeContext) -> Self {
        Self {
            ctx,
            // Candidate skill names after a verb cue. Parameter extraction is
            // deliberately not attempted here.
            skill_cue: Regex::new(
                r#"(?i)\b(?:use|execute|run)\s+(?:the\s+)?(?:skill\s+)?["']?([A-Za-z0-9_][A-Za-z0-9_-]*)["']?"#,
            )
            .expect("static regex"),
        }
    }

    /// First cue-following candidate that names a registered skill.
    fn matched_skill(
        &self,
        registry: &maestro_skills::SkillRegistry,
        instruction: &str,
    ) -> Option<String> {
        self.skill_cue
            .captures_iter(instruction)
            .filter_map(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .find(|candidate| registry.has(candidate))
    }

    #[cfg(feature = "unsafe-exec")]
    async fn generate_and_exec(&self, instruction: &str) -> String {
        let prompt = format!(
            "You are the Actor. Write a short POSIX shell snippet that accomplishes \
             the instruction below. Return ONLY the snippet, no markdown, no commentary. \
             Use plain coreutils; create parent directories where needed.\n\n\
             Instruction: {}",
            instruction
        );

        let snippet = match self
            .ctx
            .llm
            .generate(&self.ctx.config.models.tool, &prompt, false)
            .await
        {
            Ok(code) => strip_fences(&code),
            Err(e) => return format!("Error: code generation failed: {}", e),
        };

        tracing::warn!(snippet = %snippet, "executing generated shell snippet (unsafe-exec)");
        match tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&snippet)
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.trim().is_empty() {
                    "Success".to_string()
                } else {
                    stdout.trim().to_string()
                }
            }
            Ok(output) => format!(
                "Error: snippet exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => format!("Error: failed to spawn shell: {}", e),
        }
    }
}

/// Strip markdown code fences from a generated snippet.
#[cfg_attr(not(feature = "unsafe-exec"), allow(dead_code))]
pub(crate) fn strip_fences(code: &str) -> String {
    let mut lines: Vec<&str> = code.trim().lines().collect();
    if lines.first().map_or(false, |l| l.trim_start().starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().map_or(false, |l| l.trim() == "```") {
        lines.pop();
    }
    lines.join("\n").replace("```", "").trim().to_string()
}

#[async_trait]
impl GraphNode for Actor {
    fn name(&self) -> &'static str {
        "actor"
    }

    async fn run(&self, state: &ExecutionState) -> Result<StateUpdate> {
        let idx = state.current_step_index;
        let step = state
            .current_step()
            .filter(|s| s.role == StepRole::Actor)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("actor tick without an Actor step")))?;
        let instruction = step.instruction.clone();

        tracing::info!(step = idx, instruction = %instruction, "actor step");

        let matched = state.agent.as_ref().and_then(|agent| {
            self.matched_skill(agent.registry(), &instruction)
                .map(|name| (agent, name))
        });

        let output = match matched {
            Some((agent, skill_name)) => {
                match agent.registry().execute(&skill_name, json!({})).await {
                    Ok(result) => {
                        tracing::info!(skill = %skill_name, "skill executed");
                        format!("Skill '{}' executed: {}", skill_name, result)
                    }
                    Err(e) => {
                        tracing::warn!(skill = %skill_name, error = %e, "skill execution failed");
                        format!("Skill '{}' error: {}", skill_name, e)
                    }
                }
            }
            None => self.no_skill_path(&instruction).await,
        };

        Ok(StateUpdate {
            tool_outputs: vec![(format!("step_{}", idx), output)],
            current_step_index: Some(idx + 1),
            ..Default::default()
        })
    }
}

impl Actor {
    #[cfg(feature = "unsafe-exec")]
    async fn no_skill_path(&self, instruction: &str) -> String {
        if self.ctx.config.allow_exec {
            self.generate_and_exec(instruction).await
        } else {
            "No action taken: instruction matched no registered skill and code \
             execution is disabled by configuration."
                .to_string()
        }
    }

    #[cfg(not(feature = "unsafe-exec"))]
    async fn no_skill_path(&self, _instruction: &str) -> String {
        if self.ctx.config.allow_exec {
            tracing::warn!("allow_exec is set but this build was compiled without unsafe-exec");
        }
        "No action taken: instruction matched no registered skill and code \
         execution is not compiled into this build."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("echo hi"), "echo hi");
        assert_eq!(strip_fences("```sh\necho hi\n```"), "echo hi");
        assert_eq!(strip_fences("```\necho hi\n```"), "echo hi");
        assert_eq!(strip_fences("```echo hi```"), "echo hi");
    }

    #[test]
    fn test_skill_cue_regex() {
        let actor_regex = Regex::new(
            r#"(?i)\b(?:use|execute|run)\s+(?:the\s+)?(?:skill\s+)?["']?([A-Za-z0-9_][A-Za-z0-9_-]*)["']?"#,
        )
        .unwrap();

        let captures: Vec<&str> = actor_regex
            .captures_iter("Use the file-operations skill to create the file")
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        assert!(captures.contains(&"file-operations"));

        let captures: Vec<&str> = actor_regex
            .captures_iter("Run save_fact with the user's name")
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        assert_eq!(captures, vec!["save_fact"]);

        assert!(actor_regex
            .captures_iter("Summarize the document")
            .next()
            .is_none());
    }
}

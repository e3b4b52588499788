//! Verification node: audits the result of previous actions.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use maestro_core::{
    error::{Error, Result},
    types::{AuditResult, StepRole},
};

use crate::audit;
use crate::graph::GraphNode;
use crate::nodes::NodeContext;
use crate::state::{ExecutionState, StateUpdate};

#[derive(Deserialize)]
struct StrategyChoice {
    strategy: String,
    #[serde(default)]
    args: Value,
}

/// Asks the parser model to pick one strategy from the closed list, then
/// dispatches it through the hardcoded table. The cursor advances whether
/// the audit passes or not; failures are reported, not retried.
pub struct Auditor {
    ctx: NodeContext,
}

impl Auditor {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }

    fn prompt(instruction: &str, expected_outcome: &str, previous_output: &str) -> String {
        let strategies = audit::STRATEGY_SIGNATURES
            .iter()
            .map(|s| format!("  - {}", s))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are the Auditor. You need to verify the success of a task.

Instruction: "{instruction}"
Expected Outcome: "{expected_outcome}"
Previous Step Output: "{previous_output}"

Available Strategies:
{strategies}

Select the BEST strategy to verify this.
Return a JSON object with "strategy" and "args".

Examples:
- {{"strategy": "verify_file_exists", "args": {{"path": "hello.txt"}}}}
- {{"strategy": "verify_file_content_contains", "args": {{"path": "hello.txt", "substring": "Success"}}}}
- {{"strategy": "verify_tool_output_success", "args": {{}}}}

JSON Response:"#
        )
    }
}

#[async_trait]
impl GraphNode for Auditor {
    fn name(&self) -> &'static str {
        "auditor"
    }

    async fn run(&self, state: &ExecutionState) -> Result<StateUpdate> {
        let idx = state.current_step_index;
        let step = state
            .current_step()
            .filter(|s| s.role == StepRole::Auditor)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("auditor tick without an Auditor step")))?;

        // The step being verified is normally the one just before this one.
        let previous_output = idx
            .checked_sub(1)
            .and_then(|prev| state.tool_outputs.get(&format!("step_{}", prev)))
            .cloned()
            .unwrap_or_default();

        tracing::info!(step = idx, instruction = %step.instruction, "auditor step");

        let prompt = Self::prompt(
            &step.instruction,
            step.expected_outcome.as_deref().unwrap_or_default(),
            &previous_output,
        );

        let (strategy, result): (String, AuditResult) = match self
            .ctx
            .llm
            .generate(&self.ctx.config.models.parser, &prompt, true)
            .await
        {
            Ok(response) => match serde_json::from_str::<StrategyChoice>(&response) {
                Ok(choice) => {
                    let result = audit::dispatch(&choice.strategy, &choice.args, &previous_output);
                    (choice.strategy, result)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "strategy choice unparseable; using output check");
                    (
                        "verify_tool_output_success".to_string(),
                        audit::verify_tool_output_success(&previous_output),
                    )
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "auditor LLM failed; using output check");
                (
                    "verify_tool_output_success".to_string(),
                    audit::verify_tool_output_success(&previous_output),
                )
            }
        };

        if result.passed {
            tracing::info!(step = idx, strategy = %strategy, message = %result.message, "audit passed");
        } else {
            tracing::warn!(
                step = idx,
                strategy = %strategy,
                severity = ?result.severity,
                message = %result.message,
                "audit failed"
            );
        }

        let verdict = format!(
            "Audit [{}] {}: {}",
            strategy,
            if result.passed { "PASS" } else { "FAIL" },
            result.message
        );

        Ok(StateUpdate {
            tool_outputs: vec![(format!("step_{}", idx), verdict)],
            current_step_index: Some(idx + 1),
            ..Default::default()
        })
    }
}

//! Intent classification node.

use async_trait::async_trait;
use serde::Deserialize;

use maestro_core::{error::Result, types::IntentType};

use crate::graph::GraphNode;
use crate::nodes::NodeContext;
use crate::state::{ExecutionState, StateUpdate};

#[derive(Deserialize)]
struct Verdict {
    intent_type: IntentType,
    #[serde(default)]
    reasoning: String,
}

/// Labels the user input as TASK, QUESTION, or CHAT. Fails open toward
/// TASK: anything unparseable gets the full planning treatment rather than
/// a half-baked direct answer.
pub struct Classifier {
    ctx: NodeContext,
}

impl Classifier {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }

    fn prompt(user_input: &str) -> String {
        format!(
            r#"You are an intelligent intent classifier.

Analyze the following user input and classify it into one of these categories:

1. "TASK": The user wants you to DO something (create files, calculate, research, analyze, write code).
2. "QUESTION": The user is asking a specific question that can be answered directly without side effects.
3. "CHAT": The user is greeting you or making small talk.

User Input: "{}"

Return ONLY a JSON object with this format:
{{
    "intent_type": "TASK" | "QUESTION" | "CHAT",
    "reasoning": "brief explanation"
}}"#,
            user_input
        )
    }
}

#[async_trait]
impl GraphNode for Classifier {
    fn name(&self) -> &'static str {
        "classifier"
    }

    async fn run(&self, state: &ExecutionState) -> Result<StateUpdate> {
        let prompt = Self::prompt(state.user_input());

        let intent_type = match self
            .ctx
            .llm
            .generate(&self.ctx.config.models.parser, &prompt, true)
            .await
        {
            Ok(response) => match serde_json::from_str::<Verdict>(&response) {
                Ok(verdict) => {
                    tracing::info!(
                        intent = %verdict.intent_type,
                        reasoning = %verdict.reasoning,
                        "intent classified"
                    );
                    verdict.intent_type
                }
                Err(e) => {
                    tracing::warn!(error = %e, "classifier output unparseable; defaulting to TASK");
                    IntentType::Task
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "classifier LLM failed; defaulting to TASK");
                IntentType::Task
            }
        };

        Ok(StateUpdate {
            intent_type: Some(intent_type),
            ..Default::default()
        })
    }
}

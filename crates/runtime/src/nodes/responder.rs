//! Direct-answer node for QUESTION and CHAT intents.

use async_trait::async_trait;

use maestro_core::{error::Result, types::IntentType};

use crate::graph::GraphNode;
use crate::nodes::NodeContext;
use crate::state::{ExecutionState, StateUpdate};

const APOLOGY: &str = "I'm sorry, I encountered an error while generating a response.";

/// Answers the user directly, bypassing planning. An LLM failure is never
/// fatal here; the user gets an apology instead of a stack trace.
pub struct Responder {
    ctx: NodeContext,
}

impl Responder {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl GraphNode for Responder {
    fn name(&self) -> &'static str {
        "responder"
    }

    async fn run(&self, state: &ExecutionState) -> Result<StateUpdate> {
        let system_prompt = match state.intent_type {
            Some(IntentType::Chat) => {
                "You are a helpful and friendly AI assistant. Engage in conversation."
            }
            _ => "You are a helpful AI assistant. Answer the user's question clearly and concisely.",
        };
        let prompt = format!("{}\n\nUser: {}", system_prompt, state.user_input());

        let response = match self
            .ctx
            .llm
            .generate(&self.ctx.config.models.reasoning, &prompt, false)
            .await
        {
            Ok(answer) => {
                tracing::info!(response_len = answer.len(), "responder generated answer");
                answer
            }
            Err(e) => {
                tracing::warn!(error = %e, "responder LLM failed; sending apology");
                APOLOGY.to_string()
            }
        };

        Ok(StateUpdate {
            final_response: Some(response),
            ..Default::default()
        })
    }
}

//! Planning node: turns a TASK intent into an executable plan.

use async_trait::async_trait;

use maestro_core::error::Result;

use crate::graph::GraphNode;
use crate::nodes::NodeContext;
use crate::state::{ExecutionState, StateUpdate};
use crate::two_stage::TwoStagePlanner;

/// Builds the planning system prompt (skills + memory) and runs the
/// two-stage pipeline. A failed pipeline writes an empty plan so the driver
/// terminates cleanly instead of looping on nothing.
pub struct Planner {
    ctx: NodeContext,
}

impl Planner {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }

    fn system_prompt(&self, state: &ExecutionState) -> String {
        let skill_context = state
            .agent
            .as_ref()
            .map(|agent| agent.registry().prompt_context(None))
            .unwrap_or_else(|| "No skills available.".to_string());

        let mut prompt = String::from(
            "You are an expert planning assistant. Plans are executed step by step \
             by an Actor (performs actions) and an Auditor (verifies outcomes).\n\n",
        );
        prompt.push_str(&skill_context);
        if !state.memory_context.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&state.memory_context);
        }
        prompt
    }
}

#[async_trait]
impl GraphNode for Planner {
    fn name(&self) -> &'static str {
        "planner"
    }

    async fn run(&self, state: &ExecutionState) -> Result<StateUpdate> {
        let models = &self.ctx.config.models;
        let mut planner = TwoStagePlanner::new(
            self.ctx.llm.clone(),
            models.reasoning.clone(),
            models.parser.clone(),
        );
        if self.ctx.config.observability {
            planner = planner.with_transcripts(".maestro/llm");
        }

        let system_prompt = self.system_prompt(state);

        match planner.generate(state.user_input(), &system_prompt).await {
            Ok(plan) => {
                tracing::info!(
                    objective = %plan.objective,
                    steps = plan.total_steps,
                    "plan generated"
                );
                Ok(StateUpdate {
                    objective: Some(plan.objective),
                    plan: Some(plan.plan),
                    current_step_index: Some(0),
                    ..Default::default()
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "planning failed; writing empty plan");
                Ok(StateUpdate {
                    plan: Some(Vec::new()),
                    current_step_index: Some(0),
                    ..Default::default()
                })
            }
        }
    }
}

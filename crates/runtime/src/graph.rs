//! The orchestration graph: a small static topology over five nodes with
//! two pure routers, driven strictly sequentially.
//!
//! ```text
//! classifier ──(TASK)──▶ planner ──▶ step router ◀──┐
//!      │                                │   │        │
//!      └──(else)──▶ responder ──▶ END   │   └─▶ actor/auditor
//!                                       └─▶ END
//! ```

use async_trait::async_trait;

use maestro_core::{
    error::{Error, Result},
    types::{IntentType, StepRole},
};

use crate::nodes::{Actor, Auditor, Classifier, NodeContext, Planner, Responder};
use crate::state::{ExecutionState, StateUpdate};

/// A graph node: reads the state, returns a partial update. Nodes never
/// mutate state directly and never run concurrently within one run.
#[async_trait]
pub trait GraphNode: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, state: &ExecutionState) -> Result<StateUpdate>;
}

/// Where the classifier's verdict sends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRoute {
    Planner,
    Responder,
}

/// Pure router over the classified intent. Unset intent plans (fail-open).
pub fn route_intent(state: &ExecutionState) -> IntentRoute {
    match state.intent_type {
        Some(IntentType::Task) | None => IntentRoute::Planner,
        Some(IntentType::Question) | Some(IntentType::Chat) => IntentRoute::Responder,
    }
}

/// Where the step cursor sends the run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRoute {
    Actor,
    Auditor,
    End,
}

/// Pure router over `(current_step_index, plan)`.
pub fn route_step(state: &ExecutionState) -> StepRoute {
    match state.current_step() {
        None => StepRoute::End,
        Some(step) => match step.role {
            StepRole::Actor => StepRoute::Actor,
            StepRole::Auditor => StepRoute::Auditor,
        },
    }
}

/// The compiled graph. One node executes per tick; Actor/Auditor ticks must
/// advance the cursor by exactly one.
pub struct Graph {
    classifier: Box<dyn GraphNode>,
    planner: Box<dyn GraphNode>,
    actor: Box<dyn GraphNode>,
    auditor: Box<dyn GraphNode>,
    responder: Box<dyn GraphNode>,
}

impl Graph {
    /// Build the standard topology over the default nodes.
    pub fn new(ctx: NodeContext) -> Self {
        Self {
            classifier: Box::new(Classifier::new(ctx.clone())),
            planner: Box::new(Planner::new(ctx.clone())),
            actor: Box::new(Actor::new(ctx.clone())),
            auditor: Box::new(Auditor::new(ctx.clone())),
            responder: Box::new(Responder::new(ctx)),
        }
    }

    /// Run the graph to termination. A node error aborts the run; the caller
    /// owns memory finalization.
    pub async fn invoke(&self, mut state: ExecutionState) -> Result<ExecutionState> {
        let update = self.run_node(self.classifier.as_ref(), &state).await?;
        update.apply(&mut state);

        match route_intent(&state) {
            IntentRoute::Responder => {
                let update = self.run_node(self.responder.as_ref(), &state).await?;
                update.apply(&mut state);
                return Ok(state);
            }
            IntentRoute::Planner => {
                let update = self.run_node(self.planner.as_ref(), &state).await?;
                update.apply(&mut state);
            }
        }

        loop {
            let node = match route_step(&state) {
                StepRoute::End => break,
                StepRoute::Actor => self.actor.as_ref(),
                StepRoute::Auditor => self.auditor.as_ref(),
            };

            let before = state.current_step_index;
            let update = self.run_node(node, &state).await?;
            update.apply(&mut state);

            if state.current_step_index != before + 1 {
                return Err(Error::Other(anyhow::anyhow!(
                    "node '{}' moved the cursor from {} to {}; steps advance by exactly one",
                    node.name(),
                    before,
                    state.current_step_index
                )));
            }
        }

        Ok(state)
    }

    async fn run_node(&self, node: &dyn GraphNode, state: &ExecutionState) -> Result<StateUpdate> {
        tracing::debug!(node = node.name(), "tick");
        node.run(state).await.map_err(|e| {
            tracing::error!(node = node.name(), error = %e, "node failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::types::PlanStep;

    fn state_with_plan(plan: Vec<PlanStep>, index: usize) -> ExecutionState {
        let mut state = ExecutionState::new("intent", "tester", String::new(), None);
        state.plan = plan;
        state.current_step_index = index;
        state
    }

    fn step(role: StepRole) -> PlanStep {
        PlanStep {
            role,
            instruction: "do".into(),
            reasoning: None,
            expected_outcome: None,
        }
    }

    #[test]
    fn test_route_intent() {
        let mut state = ExecutionState::new("x", "tester", String::new(), None);
        assert_eq!(route_intent(&state), IntentRoute::Planner);

        state.intent_type = Some(IntentType::Task);
        assert_eq!(route_intent(&state), IntentRoute::Planner);

        state.intent_type = Some(IntentType::Question);
        assert_eq!(route_intent(&state), IntentRoute::Responder);

        state.intent_type = Some(IntentType::Chat);
        assert_eq!(route_intent(&state), IntentRoute::Responder);
    }

    #[test]
    fn test_route_step_by_role() {
        let plan = vec![step(StepRole::Actor), step(StepRole::Auditor)];

        assert_eq!(route_step(&state_with_plan(plan.clone(), 0)), StepRoute::Actor);
        assert_eq!(route_step(&state_with_plan(plan.clone(), 1)), StepRoute::Auditor);
        assert_eq!(route_step(&state_with_plan(plan.clone(), 2)), StepRoute::End);
        // Far past the end is still terminal.
        assert_eq!(route_step(&state_with_plan(plan, 99)), StepRoute::End);
    }

    #[test]
    fn test_route_step_empty_plan_terminates() {
        assert_eq!(route_step(&state_with_plan(Vec::new(), 0)), StepRoute::End);
    }
}

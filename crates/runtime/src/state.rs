//! The single evolving state threaded through the orchestration graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use maestro_core::types::{IntentType, PlanStep};

use crate::agent::Agent;

/// One conversational message.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Per-run execution state. Owned by a single in-flight `run()`; nodes read
/// it and return partial updates, never mutate it directly.
#[derive(Clone)]
pub struct ExecutionState {
    /// Append-only conversation; `messages[0]` is the user intent.
    pub messages: Vec<Message>,
    pub intent_type: Option<IntentType>,
    pub objective: Option<String>,
    /// Immutable once the Planner has written it.
    pub plan: Vec<PlanStep>,
    /// Cursor into `plan`; advanced only by Actor/Auditor ticks.
    pub current_step_index: usize,
    /// `"step_{i}"` → observed output of that step.
    pub tool_outputs: BTreeMap<String, String>,
    pub final_response: Option<String>,
    /// Memory snapshot injected into planner prompts.
    pub memory_context: String,
    pub agent_name: String,
    pub auto_log_enabled: bool,
    /// Non-owning handle back to the running Agent, so nodes can reach the
    /// skill registry.
    pub agent: Option<Arc<Agent>>,
}

impl ExecutionState {
    pub fn new(
        intent: &str,
        agent_name: &str,
        memory_context: String,
        agent: Option<Arc<Agent>>,
    ) -> Self {
        Self {
            messages: vec![Message {
                role: "user".to_string(),
                content: intent.to_string(),
            }],
            intent_type: None,
            objective: None,
            plan: Vec::new(),
            current_step_index: 0,
            tool_outputs: BTreeMap::new(),
            final_response: None,
            memory_context,
            agent_name: agent_name.to_string(),
            auto_log_enabled: true,
            agent,
        }
    }

    /// The original user intent.
    pub fn user_input(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// The plan step under the cursor, if any.
    pub fn current_step(&self) -> Option<&PlanStep> {
        self.plan.get(self.current_step_index)
    }
}

/// Partial state produced by one node tick; the driver merges it.
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub intent_type: Option<IntentType>,
    pub objective: Option<String>,
    pub plan: Option<Vec<PlanStep>>,
    pub current_step_index: Option<usize>,
    /// New `tool_outputs` entries to insert.
    pub tool_outputs: Vec<(String, String)>,
    pub final_response: Option<String>,
}

impl StateUpdate {
    pub fn apply(self, state: &mut ExecutionState) {
        if let Some(intent_type) = self.intent_type {
            state.intent_type = Some(intent_type);
        }
        if let Some(objective) = self.objective {
            state.objective = Some(objective);
        }
        if let Some(plan) = self.plan {
            state.plan = plan;
        }
        if let Some(index) = self.current_step_index {
            state.current_step_index = index;
        }
        for (key, output) in self.tool_outputs {
            state.tool_outputs.insert(key, output);
        }
        if let Some(response) = self.final_response {
            state.final_response = Some(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::types::StepRole;

    #[test]
    fn test_update_merge_is_partial() {
        let mut state = ExecutionState::new("do things", "tester", String::new(), None);
        state.tool_outputs.insert("step_0".into(), "first".into());

        let update = StateUpdate {
            intent_type: Some(IntentType::Task),
            plan: Some(vec![PlanStep {
                role: StepRole::Actor,
                instruction: "act".into(),
                reasoning: None,
                expected_outcome: None,
            }]),
            current_step_index: Some(1),
            tool_outputs: vec![("step_1".into(), "second".into())],
            ..Default::default()
        };
        update.apply(&mut state);

        assert_eq!(state.intent_type, Some(IntentType::Task));
        assert_eq!(state.plan.len(), 1);
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.tool_outputs.len(), 2);
        assert_eq!(state.final_response, None);
        assert_eq!(state.user_input(), "do things");
    }
}

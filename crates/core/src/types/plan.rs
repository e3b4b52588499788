use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Who carries out a plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepRole {
    /// Performs an action.
    Actor,
    /// Verifies the result of a previous action.
    Auditor,
}

/// A single step of an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub role: StepRole,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
}

/// A validated execution plan produced by the two-stage planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub objective: String,
    pub plan: Vec<PlanStep>,
    pub total_steps: usize,
}

impl Plan {
    /// Check structural invariants. A mismatched `total_steps` is corrected
    /// in place (small models routinely miscount); an empty instruction is
    /// a hard failure.
    pub fn validate(&mut self) -> Result<()> {
        for (i, step) in self.plan.iter().enumerate() {
            if step.instruction.trim().is_empty() {
                return Err(Error::plan_invalid(format!(
                    "step {} has an empty instruction",
                    i
                )));
            }
        }
        if self.total_steps != self.plan.len() {
            self.total_steps = self.plan.len();
        }
        Ok(())
    }
}

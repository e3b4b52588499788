//! Two-stage planning pipeline.
//!
//! Stage 1 lets a reasoning model think in free-form text; stage 2 has a
//! parser model structure that text into the exact plan JSON. The split
//! exists because the models that reason best are rarely the models that
//! emit clean JSON, and vice versa.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

use maestro_core::{
    error::{Error, Result},
    traits::LlmClient,
    types::Plan,
};

/// Reasoning-then-structuring plan generator.
pub struct TwoStagePlanner {
    llm: Arc<dyn LlmClient>,
    reasoning_model: String,
    parser_model: String,
    /// When set, prompts and responses of both stages are dumped here for
    /// post-mortem.
    transcript_dir: Option<PathBuf>,
}

impl TwoStagePlanner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        reasoning_model: impl Into<String>,
        parser_model: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            reasoning_model: reasoning_model.into(),
            parser_model: parser_model.into(),
            transcript_dir: None,
        }
    }

    /// Enable transcript dumps under `dir`.
    pub fn with_transcripts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = Some(dir.into());
        self
    }

    /// Run both stages and return a validated plan. Validation failure is
    /// fatal (`Error::PlanInvalid`); the planner does not retry.
    pub async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<Plan> {
        let run_dir = self
            .transcript_dir
            .as_ref()
            .map(|dir| dir.join(Utc::now().format("%Y%m%d_%H%M%S").to_string()));

        // Stage 1: free-form reasoning.
        let reasoning_prompt = format!(
            "{}\n\nUser request: {}\n\n\
             Think through this request step-by-step and create a detailed execution plan. \
             For each step:\n\
             - Specify who should do it (Actor performs actions, Auditor validates)\n\
             - Explain what needs to be done\n\
             - Explain why it's necessary\n\
             - Describe what success looks like\n\n\
             Generate a comprehensive, well-reasoned plan:",
            system_prompt, prompt
        );

        tracing::info!(
            stage = 1,
            model = %self.reasoning_model,
            prompt_len = reasoning_prompt.len(),
            "planner stage start"
        );
        let reasoning = self
            .llm
            .generate(&self.reasoning_model, &reasoning_prompt, false)
            .await
            .map_err(|e| {
                tracing::error!(stage = 1, model = %self.reasoning_model, error = %e, "planner stage failed");
                e
            })?;
        tracing::info!(stage = 1, response_len = reasoning.len(), "planner stage complete");

        self.dump(&run_dir, "stage1_reasoning", &reasoning_prompt, &reasoning);

        // Stage 2: structure the reasoning into JSON.
        let structuring_prompt = format!(
            r#"Convert the following reasoning plan into valid JSON.

REASONING PLAN:
{reasoning}

REQUIRED JSON STRUCTURE:
{{
  "objective": "brief description of the overall goal",
  "plan": [
    {{
      "role": "Actor or Auditor",
      "instruction": "what to do",
      "reasoning": "why it's needed (optional)",
      "expected_outcome": "what success looks like (optional)"
    }}
  ],
  "total_steps": number
}}

CRITICAL RULES:
- Use EXACTLY these field names: "objective", "plan", "role", "instruction", "reasoning", "expected_outcome", "total_steps"
- "role" must be EITHER "Actor" OR "Auditor" - no other values
- Each step must have "role" and "instruction" at minimum
- Maintain the reasoning and expected outcomes from the original plan

Generate the JSON now:"#
        );

        tracing::info!(
            stage = 2,
            model = %self.parser_model,
            prompt_len = structuring_prompt.len(),
            "planner stage start"
        );
        let structured = self
            .llm
            .generate(&self.parser_model, &structuring_prompt, true)
            .await
            .map_err(|e| {
                tracing::error!(stage = 2, model = %self.parser_model, error = %e, "planner stage failed");
                e
            })?;
        tracing::info!(stage = 2, response_len = structured.len(), "planner stage complete");

        self.dump(&run_dir, "stage2_json", &structuring_prompt, &structured);

        let mut plan: Plan = serde_json::from_str(&structured).map_err(|e| {
            Error::plan_invalid(format!(
                "structured output does not match the plan schema: {}",
                e
            ))
        })?;
        plan.validate()?;
        Ok(plan)
    }

    fn dump(&self, run_dir: &Option<PathBuf>, stage: &str, prompt: &str, response: &str) {
        let Some(dir) = run_dir else { return };
        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(dir)?;
            let model = if stage.starts_with("stage1") {
                &self.reasoning_model
            } else {
                &self.parser_model
            };
            std::fs::write(
                dir.join(format!("{}_{}.txt", stage, model.replace(':', "_"))),
                format!("PROMPT:\n{}\n\nOUTPUT:\n{}\n", prompt, response),
            )
        };
        if let Err(e) = write() {
            tracing::warn!(error = %e, "failed to save planner transcript");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::types::StepRole;
    use maestro_llm::MockLlmClient;
    use serde_json::json;

    fn plan_json() -> String {
        json!({
            "objective": "create hello.txt",
            "plan": [
                {"role": "Actor", "instruction": "write hello.txt"},
                {"role": "Auditor", "instruction": "verify hello.txt", "expected_outcome": "exists"}
            ],
            "total_steps": 2
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_two_stage_produces_validated_plan() {
        let mock = Arc::new(MockLlmClient::scripted(vec![
            "1. Actor writes the file. 2. Auditor verifies it.".to_string(),
            plan_json(),
        ]));
        let planner = TwoStagePlanner::new(mock.clone(), "reasoner", "parser");

        let plan = planner.generate("create hello.txt", "system").await.unwrap();
        assert_eq!(plan.total_steps, 2);
        assert_eq!(plan.plan[0].role, StepRole::Actor);
        assert_eq!(plan.plan[1].role, StepRole::Auditor);

        // Stage 2 embeds the stage 1 text verbatim.
        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].json_mode);
        assert!(calls[1].json_mode);
        assert!(calls[1].prompt.contains("Actor writes the file"));
        assert!(calls[1].prompt.contains("REQUIRED JSON STRUCTURE"));
    }

    #[tokio::test]
    async fn test_bad_role_is_plan_invalid() {
        let bad = json!({
            "objective": "x",
            "plan": [{"role": "Overseer", "instruction": "watch"}],
            "total_steps": 1
        })
        .to_string();
        let mock = Arc::new(MockLlmClient::scripted(vec!["reasoning".into(), bad]));
        let planner = TwoStagePlanner::new(mock, "reasoner", "parser");

        let err = planner.generate("x", "").await.unwrap_err();
        assert!(matches!(err, Error::PlanInvalid(_)));
    }

    #[tokio::test]
    async fn test_miscounted_total_steps_is_corrected() {
        let off_by_one = json!({
            "objective": "x",
            "plan": [{"role": "Actor", "instruction": "do"}],
            "total_steps": 3
        })
        .to_string();
        let mock = Arc::new(MockLlmClient::scripted(vec!["reasoning".into(), off_by_one]));
        let planner = TwoStagePlanner::new(mock, "reasoner", "parser");

        let plan = planner.generate("x", "").await.unwrap();
        assert_eq!(plan.total_steps, 1);
    }

    #[tokio::test]
    async fn test_transcripts_are_dumped() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockLlmClient::scripted(vec![
            "reasoning".into(),
            plan_json(),
        ]));
        let planner =
            TwoStagePlanner::new(mock, "reasoner", "parser").with_transcripts(dir.path());

        planner.generate("x", "").await.unwrap();

        let run_dirs: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(run_dirs.len(), 1);
        let files: Vec<String> = std::fs::read_dir(run_dirs[0].path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(files.iter().any(|f| f.starts_with("stage1_reasoning")));
        assert!(files.iter().any(|f| f.starts_with("stage2_json")));
    }
}

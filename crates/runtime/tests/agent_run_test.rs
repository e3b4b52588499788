//! End-to-end runs through the full graph with scripted and canned mock
//! LLMs.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use maestro_core::{
    error::Result,
    traits::LlmClient,
    types::{IntentType, StepRole},
    Provider, RuntimeConfig,
};
use maestro_llm::MockLlmClient;
use maestro_runtime::Agent;
use maestro_skills::{RuntimeTable, SkillRuntime};

fn test_config(root: &Path) -> Arc<RuntimeConfig> {
    Arc::new(RuntimeConfig {
        provider: Provider::Mock,
        agents_root: root.join("agents"),
        core_skills_root: root.join("skills/core"),
        embedding_dim: 16,
        ..Default::default()
    })
}

async fn ready_agent(
    name: &str,
    root: &Path,
    llm: Arc<dyn LlmClient>,
    extra: RuntimeTable,
) -> Arc<Agent> {
    let config = test_config(root);
    std::fs::create_dir_all(&config.core_skills_root).unwrap();
    let mut agent = Agent::new(name, "test agent", config, llm).unwrap();
    agent.initialize_with_runtimes(extra).unwrap();
    Arc::new(agent)
}

/// Writes a fixed file when invoked, no parameters needed.
struct ArtifactRuntime {
    path: std::path::PathBuf,
}

#[async_trait]
impl SkillRuntime for ArtifactRuntime {
    async fn execute(&self, _params: Value) -> Result<Value> {
        std::fs::create_dir_all(self.path.parent().unwrap())?;
        std::fs::write(&self.path, "End-to-End Test Successful")?;
        Ok(json!({"ok": true}))
    }
}

fn classifier_json(intent: &str) -> String {
    json!({"intent_type": intent, "reasoning": "scripted"}).to_string()
}

#[tokio::test]
async fn test_question_goes_to_responder() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(MockLlmClient::scripted(vec![
        classifier_json("QUESTION"),
        "The capital of France is Paris.".to_string(),
    ]));
    let agent = ready_agent("quiz", dir.path(), llm, RuntimeTable::new()).await;

    let outcome = agent.run("What is the capital of France?").await.unwrap();

    assert_eq!(outcome.intent_type, Some(IntentType::Question));
    assert_eq!(
        outcome.final_response.as_deref(),
        Some("The capital of France is Paris.")
    );
    assert!(outcome.plan.is_empty());
    assert!(outcome.tool_outputs.is_empty());
}

#[tokio::test]
async fn test_task_executes_skill_and_audits_file() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("results/e2e_test.txt");

    let plan = json!({
        "objective": "Create the end-to-end artifact",
        "plan": [
            {"role": "Actor", "instruction": "Run make-artifact to produce the test file"},
            {"role": "Auditor", "instruction": "Verify the artifact contains the expected text"}
        ],
        "total_steps": 2
    });
    let strategy = json!({
        "strategy": "verify_file_content_contains",
        "args": {"path": artifact.to_str().unwrap(), "substring": "End-to-End Test Successful"}
    });

    let llm = Arc::new(MockLlmClient::scripted(vec![
        classifier_json("TASK"),
        "1. Actor runs make-artifact. 2. Auditor verifies the file.".to_string(),
        plan.to_string(),
        strategy.to_string(),
    ]));

    let mut extra = RuntimeTable::new();
    extra.insert(
        "make-artifact".into(),
        Arc::new(ArtifactRuntime {
            path: artifact.clone(),
        }) as Arc<dyn SkillRuntime>,
    );
    // The skill needs a manifest on disk for the registry to discover it.
    let config = test_config(dir.path());
    let skill_dir = config.agent_skills_dir("maker");
    std::fs::create_dir_all(&skill_dir).unwrap();
    std::fs::write(
        skill_dir.join("make-artifact.yaml"),
        "name: make-artifact\ndescription: Writes the e2e artifact\n",
    )
    .unwrap();

    let agent = ready_agent("maker", dir.path(), llm, extra).await;
    let outcome = agent
        .run("Create the file results/e2e_test.txt with the test content")
        .await
        .unwrap();

    // The Actor step really left the file on disk.
    assert_eq!(
        std::fs::read_to_string(&artifact).unwrap(),
        "End-to-End Test Successful"
    );

    assert_eq!(outcome.intent_type, Some(IntentType::Task));
    assert_eq!(outcome.plan.len(), 2);
    assert_eq!(outcome.plan[0].role, StepRole::Actor);
    assert!(outcome.tool_outputs["step_0"].contains("make-artifact"));
    assert!(outcome.tool_outputs["step_1"].contains("PASS"));
    assert!(outcome.tool_outputs["step_1"].contains("verify_file_content_contains"));
}

#[tokio::test]
async fn test_unparseable_classifier_defaults_to_task() {
    let dir = tempfile::tempdir().unwrap();
    let empty_plan = json!({"objective": "nothing", "plan": [], "total_steps": 0});
    let llm = Arc::new(MockLlmClient::scripted(vec![
        "{not json at all".to_string(),
        "reasoning text".to_string(),
        empty_plan.to_string(),
    ]));
    let agent = ready_agent("fallback", dir.path(), llm, RuntimeTable::new()).await;

    let outcome = agent.run("gibberish input").await.unwrap();
    assert_eq!(outcome.intent_type, Some(IntentType::Task));
    assert!(outcome.plan.is_empty());
    assert!(outcome.tool_outputs.is_empty());
}

#[tokio::test]
async fn test_invalid_plan_terminates_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    // Stage 2 emits a role outside the closed set.
    let bad_plan = json!({
        "objective": "x",
        "plan": [{"role": "Overseer", "instruction": "watch"}],
        "total_steps": 1
    });
    let llm = Arc::new(MockLlmClient::scripted(vec![
        classifier_json("TASK"),
        "reasoning".to_string(),
        bad_plan.to_string(),
    ]));
    let agent = ready_agent("strictplan", dir.path(), llm, RuntimeTable::new()).await;

    // plan-invalid is recovered by the planner node: empty plan, no steps.
    let outcome = agent.run("do something").await.unwrap();
    assert!(outcome.plan.is_empty());
    assert!(outcome.final_response.is_none());
}

#[tokio::test]
async fn test_actor_without_matching_skill_still_advances() {
    let dir = tempfile::tempdir().unwrap();
    let plan = json!({
        "objective": "x",
        "plan": [
            {"role": "Actor", "instruction": "Contemplate the meaning of life"},
            {"role": "Auditor", "instruction": "Verify the contemplation"}
        ],
        "total_steps": 2
    });
    let llm = Arc::new(MockLlmClient::scripted(vec![
        classifier_json("TASK"),
        "reasoning".to_string(),
        plan.to_string(),
        json!({"strategy": "verify_tool_output_success", "args": {}}).to_string(),
    ]));
    let agent = ready_agent("thinker", dir.path(), llm, RuntimeTable::new()).await;

    let outcome = agent.run("contemplate").await.unwrap();
    assert_eq!(outcome.tool_outputs.len(), 2);
    assert!(outcome.tool_outputs["step_0"].contains("No action taken"));
}

#[tokio::test]
async fn test_run_finalizes_memory() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(MockLlmClient::scripted(vec![
        classifier_json("CHAT"),
        "Hello there!".to_string(),
    ]));
    let agent = ready_agent("greeter", dir.path(), llm, RuntimeTable::new()).await;

    agent.run("hello friend").await.unwrap();

    let now = agent.memory().read_now();
    assert!(now.contains("Idle - Task completed"));

    let log = agent.memory().read_log(None);
    assert!(log.contains("User intent: hello friend"));
    assert!(log.contains("Task completed. Response: Hello there!"));
}

#[tokio::test]
async fn test_canned_mock_runs_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(MockLlmClient::canned(16));
    let agent = ready_agent("offline", dir.path(), llm, RuntimeTable::new()).await;

    // Question path.
    let outcome = agent.run("What is the capital of France?").await.unwrap();
    assert_eq!(outcome.intent_type, Some(IntentType::Question));
    assert!(outcome.final_response.is_some());

    // Task path: the canned plan references a skill that may not execute
    // cleanly, but the run must still complete with the cursor at the end.
    let outcome = agent.run("Create a file named hello.txt").await.unwrap();
    assert_eq!(outcome.intent_type, Some(IntentType::Task));
    assert_eq!(outcome.plan.len(), 2);
    assert_eq!(outcome.tool_outputs.len(), 2);
}

#[tokio::test]
async fn test_uninitialized_agent_refuses_to_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let agent = Arc::new(
        Agent::new(
            "lazy",
            "",
            config,
            Arc::new(MockLlmClient::canned(16)) as Arc<dyn LlmClient>,
        )
        .unwrap(),
    );

    assert!(agent.run("anything").await.is_err());
}

#[tokio::test]
async fn test_agent_name_is_lowercased() {
    let dir = tempfile::tempdir().unwrap();
    let agent = ready_agent(
        "MixedCase",
        dir.path(),
        Arc::new(MockLlmClient::canned(16)),
        RuntimeTable::new(),
    )
    .await;
    assert_eq!(agent.name(), "mixedcase");
    assert!(dir.path().join("agents/mixedcase/memory/NOW.md").exists());
}

//! The Agent: a named runtime entity owning one skill registry and one
//! memory manager.

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use maestro_core::{
    error::{Error, Result},
    traits::LlmClient,
    types::{EntryType, IntentType, PlanStep},
    RuntimeConfig,
};
use maestro_memory::MemoryManager;
use maestro_skills::{core_runtimes, RuntimeTable, SkillRegistry};

use crate::graph::Graph;
use crate::nodes::NodeContext;
use crate::state::ExecutionState;

/// What a completed run hands back to the caller. For QUESTION/CHAT only
/// `final_response` is interesting; for TASK the full plan and step outputs
/// are included and the caller decides how to render them.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub intent_type: Option<IntentType>,
    pub objective: Option<String>,
    pub plan: Vec<PlanStep>,
    pub tool_outputs: BTreeMap<String, String>,
    pub final_response: Option<String>,
}

/// A named agent. Construct, `initialize()`, then call `run()` as often as
/// needed. Agents with distinct names share nothing on disk; concurrent
/// `run()`s on one Agent instance are not supported.
pub struct Agent {
    name: String,
    description: String,
    config: Arc<RuntimeConfig>,
    llm: Arc<dyn LlmClient>,
    registry: SkillRegistry,
    memory: Arc<MemoryManager>,
    initialized: bool,
}

impl Agent {
    /// Create an agent. The name is lowercased; it doubles as a filesystem
    /// segment under the agents root.
    pub fn new(
        name: &str,
        description: &str,
        config: Arc<RuntimeConfig>,
        llm: Arc<dyn LlmClient>,
    ) -> Result<Self> {
        let name = name.to_lowercase();
        let memory = Arc::new(MemoryManager::new(&name, &config, llm.clone())?);
        let registry = SkillRegistry::new(&name);

        Ok(Self {
            name,
            description: description.to_string(),
            config,
            llm,
            registry,
            memory,
            initialized: false,
        })
    }

    /// Load both skill layers. Idempotent.
    pub fn initialize(&mut self) -> Result<()> {
        self.initialize_with_runtimes(RuntimeTable::new())
    }

    /// Load both skill layers, with `extra` runtime hooks available to
    /// manifests in addition to the built-in core hooks.
    pub fn initialize_with_runtimes(&mut self, extra: RuntimeTable) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let mut runtimes = core_runtimes(self.memory.clone());
        runtimes.extend(extra);

        let agent_skills = self.config.agent_skills_dir(&self.name);
        self.registry.initialize(
            &self.config.core_skills_root,
            Some(&agent_skills),
            &runtimes,
        )?;
        self.initialized = true;

        tracing::info!(
            agent = %self.name,
            skills = self.registry.stats().total,
            "agent ready"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.memory
    }

    /// Execute an intent through the orchestration graph.
    ///
    /// Memory is always finalized before returning: a completion (or error)
    /// entry lands in the activity log and NOW.md reflects the outcome.
    pub async fn run(self: &Arc<Self>, intent: &str) -> Result<RunOutcome> {
        if !self.initialized {
            return Err(Error::Other(anyhow::anyhow!(
                "agent '{}' not initialized; call initialize() first",
                self.name
            )));
        }

        tracing::info!(agent = %self.name, intent, "processing intent");

        let memory_context = self.memory.format_context_for_prompt();
        if let Err(e) =
            self.memory
                .append_log(EntryType::UserFeedback, &format!("User intent: {}", intent), None)
        {
            tracing::warn!(error = %e, "intent log entry lost");
        }

        let graph = Graph::new(NodeContext {
            llm: self.llm.clone(),
            config: self.config.clone(),
        });
        let state = ExecutionState::new(intent, &self.name, memory_context, Some(Arc::clone(self)));

        match graph.invoke(state).await {
            Ok(state) => {
                if let Some(response) = &state.final_response {
                    let preview: String = response.chars().take(200).collect();
                    if let Err(e) = self.memory.append_log(
                        EntryType::System,
                        &format!("Task completed. Response: {}", preview),
                        None,
                    ) {
                        tracing::warn!(error = %e, "completion log entry lost");
                    }
                }
                if let Err(e) = self.memory.update_now(
                    "Idle - Task completed",
                    Some(&["Awaiting next user input".to_string()]),
                ) {
                    tracing::warn!(error = %e, "status update lost");
                }

                self.maybe_compact().await;

                Ok(RunOutcome {
                    intent_type: state.intent_type,
                    objective: state.objective,
                    plan: state.plan,
                    tool_outputs: state.tool_outputs,
                    final_response: state.final_response,
                })
            }
            Err(e) => {
                if let Err(log_err) = self.memory.append_log(
                    EntryType::Error,
                    &format!("Error during execution: {}", e),
                    Some(&json!({"error": e.to_string()})),
                ) {
                    tracing::warn!(error = %log_err, "error log entry lost");
                }
                if let Err(now_err) = self.memory.update_now(
                    "Error encountered - Recovery needed",
                    Some(&[
                        "Review error in LOG.md".to_string(),
                        "Analyze root cause".to_string(),
                        "Implement fix".to_string(),
                    ]),
                ) {
                    tracing::warn!(error = %now_err, "status update lost");
                }
                Err(e)
            }
        }
    }

    /// Compact the WARM log when it has crossed a threshold. The summary is
    /// asked of the reasoning model; a deterministic fallback keeps
    /// compaction from ever blocking on a broken backend.
    async fn maybe_compact(&self) {
        match self.memory.compaction_needed() {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::warn!(error = %e, "compaction check failed");
                return;
            }
        }

        let log = self.memory.read_log(None);
        let excerpt: String = log.chars().take(12_000).collect();
        let prompt = format!(
            "Summarize the following agent activity log in under 200 words. \
             Keep concrete outcomes, decisions, and user facts; drop routine noise. \
             Respond with ONLY the summary text.\n\n{}",
            excerpt
        );

        let summary = match self
            .llm
            .generate(&self.config.models.reasoning, &prompt, false)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) | Err(_) => format!(
                "Automated compaction of the activity log for agent '{}'.",
                self.name
            ),
        };

        if let Err(e) = self.memory.compact_log(&summary).await {
            tracing::warn!(error = %e, "log compaction failed");
        }
    }
}

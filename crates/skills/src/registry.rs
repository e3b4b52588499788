//! Layered skill registry: discovery, validation, indexing, and invocation.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use maestro_core::{
    error::{Error, Result},
    types::{ParameterSpec, SkillExample},
};

use crate::manifest::{self, SkillManifest};

/// Callable hook backing a skill. Hooks are compiled in and resolved by
/// name at load time; manifests without a hook are documentation-only.
#[async_trait]
pub trait SkillRuntime: Send + Sync {
    async fn execute(&self, params: Value) -> Result<Value>;
}

/// Compiled-in hooks, keyed by skill name.
pub type RuntimeTable = HashMap<String, Arc<dyn SkillRuntime>>;

/// A registered skill: manifest metadata plus an optional runtime hook.
#[derive(Clone)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub returns: Value,
    pub examples: Vec<SkillExample>,
    pub version: String,
    /// Owning agent name, or "core" for universal skills.
    pub agent: String,
    pub is_core: bool,
    pub overrides_core: bool,
    /// Markdown body of SKILL.md, used as prompt context.
    pub prompt_instructions: Option<String>,
    pub runtime: Option<Arc<dyn SkillRuntime>>,
}

impl Skill {
    fn from_manifest(
        manifest: SkillManifest,
        agent: &str,
        is_core: bool,
        prompt_instructions: Option<String>,
        runtime: Option<Arc<dyn SkillRuntime>>,
    ) -> Self {
        Self {
            name: manifest.name,
            description: manifest.description,
            category: manifest.category.unwrap_or_else(|| "general".to_string()),
            tags: manifest.tags,
            parameters: manifest.parameters,
            returns: manifest.returns,
            examples: manifest.examples,
            version: manifest.version.unwrap_or_else(|| "1.0.0".to_string()),
            agent: agent.to_string(),
            is_core,
            overrides_core: false,
            prompt_instructions,
            runtime,
        }
    }

    /// Invoke the skill with a JSON object of parameters, validating
    /// required parameters first.
    pub async fn execute(&self, params: Value) -> Result<Value> {
        let map = params.as_object().cloned().unwrap_or_default();
        for (name, spec) in &self.parameters {
            if spec.required && !map.contains_key(name) {
                return Err(Error::MissingParameter {
                    skill: self.name.clone(),
                    parameter: name.clone(),
                });
            }
        }

        let Some(runtime) = &self.runtime else {
            return Err(Error::SkillNoRuntime(self.name.clone()));
        };

        runtime
            .execute(Value::Object(map))
            .await
            .map_err(|e| match e {
                e @ Error::MissingParameter { .. } => e,
                other => Error::skill_execution(format!("'{}': {}", self.name, other)),
            })
    }

    /// Compact `name(param*, param)` signature for prompt context.
    fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|(name, spec)| {
                if spec.required {
                    format!("{}*", name)
                } else {
                    name.clone()
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl std::fmt::Debug for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skill")
            .field("name", &self.name)
            .field("agent", &self.agent)
            .field("is_core", &self.is_core)
            .field("overrides_core", &self.overrides_core)
            .field("has_runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Registry statistics, reported after initialization.
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total: usize,
    pub core: usize,
    pub overrides: usize,
    pub by_agent: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

/// Central catalog of skills for one agent.
///
/// Layer 0 is the universal core skill tree; layer 1 is the agent's own
/// tree, which may override core skills by name. Read-only after
/// `initialize`.
pub struct SkillRegistry {
    agent_name: String,
    skills: HashMap<String, Skill>,
    core_skills: HashMap<String, Skill>,
    by_agent: HashMap<String, Vec<String>>,
    by_category: HashMap<String, Vec<String>>,
    initialized: bool,
}

impl SkillRegistry {
    pub fn new(agent_name: &str) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            skills: HashMap::new(),
            core_skills: HashMap::new(),
            by_agent: HashMap::new(),
            by_category: HashMap::new(),
            initialized: false,
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Layered loading: core skills first, then (unless this registry is the
    /// core registry itself) the agent's own skill tree. Idempotent.
    pub fn initialize(
        &mut self,
        core_skills_root: &Path,
        agent_skills_root: Option<&Path>,
        runtimes: &RuntimeTable,
    ) -> Result<()> {
        if self.initialized {
            tracing::debug!(agent = %self.agent_name, "registry already initialized");
            return Ok(());
        }

        let core_count = self.scan_directory(core_skills_root, "core", true, runtimes);
        if core_count == 0 {
            tracing::warn!(path = %core_skills_root.display(), "no core skills found");
        }

        if self.agent_name != "core" {
            if let Some(root) = agent_skills_root {
                if root.is_dir() {
                    let agent = self.agent_name.clone();
                    self.scan_directory(root, &agent, false, runtimes);
                }
            }
        }

        self.initialized = true;
        let stats = self.stats();
        tracing::info!(
            agent = %self.agent_name,
            total = stats.total,
            core = stats.core,
            overrides = stats.overrides,
            "skill registry initialized"
        );
        Ok(())
    }

    /// Scan one directory tree for both skill formats. Returns the number of
    /// skills registered; individual load failures are logged and skipped.
    fn scan_directory(
        &mut self,
        dir: &Path,
        agent: &str,
        is_core: bool,
        runtimes: &RuntimeTable,
    ) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            if is_core {
                tracing::warn!(path = %dir.display(), "skills directory not found");
            }
            return 0;
        };

        let mut count = 0;
        let mut single_files: Vec<std::path::PathBuf> = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if path.join("SKILL.md").is_file() {
                    match self.load_manifest_dir(&path, agent, is_core, runtimes) {
                        Ok(skill) => {
                            self.register_skill(skill);
                            count += 1;
                        }
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "skipping skill dir");
                        }
                    }
                } else {
                    count += self.scan_directory(&path, agent, is_core, runtimes);
                }
            } else if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                single_files.push(path);
            }
        }

        for path in single_files {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if stem.starts_with("__") {
                continue;
            }
            // Manifest-dir skills win over single-file skills of the same name.
            if self.has(stem) {
                continue;
            }

            match manifest::load_single_file(&path) {
                Ok(manifest) => {
                    if manifest.name != stem && self.has(&manifest.name) {
                        continue;
                    }
                    let runtime = runtimes.get(&manifest.name).cloned();
                    let skill = Skill::from_manifest(manifest, agent, is_core, None, runtime);
                    self.register_skill(skill);
                    count += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping skill file");
                }
            }
        }

        if count > 0 {
            tracing::debug!(
                path = %dir.display(),
                count,
                layer = if is_core { "core" } else { "agent" },
                "skills registered"
            );
        }
        count
    }

    fn load_manifest_dir(
        &self,
        skill_dir: &Path,
        agent: &str,
        is_core: bool,
        runtimes: &RuntimeTable,
    ) -> anyhow::Result<Skill> {
        let content = std::fs::read_to_string(skill_dir.join("SKILL.md"))?;
        let (manifest, body) = manifest::parse_skill_md(&content)?;
        let runtime = runtimes.get(&manifest.name).cloned();
        let instructions = (!body.is_empty()).then_some(body);
        Ok(Skill::from_manifest(
            manifest,
            agent,
            is_core,
            instructions,
            runtime,
        ))
    }

    /// Register one skill, handling core/agent override semantics and
    /// keeping all three indices consistent.
    pub fn register_skill(&mut self, mut skill: Skill) {
        for (name, spec) in &skill.parameters {
            if spec.required && spec.default.is_some() {
                tracing::warn!(
                    skill = %skill.name,
                    parameter = %name,
                    "required parameter declares a default; ignoring the default"
                );
            }
        }

        if let Some(existing) = self.skills.get(&skill.name) {
            if existing.is_core && !skill.is_core {
                skill.overrides_core = true;
                tracing::info!(skill = %skill.name, "agent skill overrides core skill");
            } else if skill.is_core && !existing.is_core {
                tracing::warn!(
                    skill = %skill.name,
                    "core skill arrived after agent skill; keeping the agent skill"
                );
                return;
            } else {
                tracing::warn!(skill = %skill.name, "duplicate skill registration; overwriting");
            }
        }

        if skill.is_core {
            self.core_skills.insert(skill.name.clone(), skill.clone());
        }

        let agent_index = self.by_agent.entry(skill.agent.clone()).or_default();
        if !agent_index.contains(&skill.name) {
            agent_index.push(skill.name.clone());
        }
        let category_index = self.by_category.entry(skill.category.clone()).or_default();
        if !category_index.contains(&skill.name) {
            category_index.push(skill.name.clone());
        }

        self.skills.insert(skill.name.clone(), skill);
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    /// The core-layer view of a skill, even when overridden.
    pub fn get_core(&self, name: &str) -> Option<&Skill> {
        self.core_skills.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    pub fn all(&self) -> Vec<&Skill> {
        let mut skills: Vec<&Skill> = self.skills.values().collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    pub fn by_agent(&self, agent: &str) -> Vec<&Skill> {
        self.by_agent
            .get(agent)
            .map(|names| names.iter().filter_map(|n| self.skills.get(n)).collect())
            .unwrap_or_default()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Skill> {
        self.by_category
            .get(category)
            .map(|names| names.iter().filter_map(|n| self.skills.get(n)).collect())
            .unwrap_or_default()
    }

    /// Case-insensitive substring search over name, description, and tags.
    pub fn search(&self, query: &str) -> Vec<&Skill> {
        let query = query.to_lowercase();
        let mut matches: Vec<&Skill> = self
            .skills
            .values()
            .filter(|skill| {
                skill.name.to_lowercase().contains(&query)
                    || skill.description.to_lowercase().contains(&query)
                    || skill.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    /// Deterministic "Available skills:" block for LLM prompts.
    pub fn prompt_context(&self, agent: Option<&str>) -> String {
        let mut skills = match agent {
            Some(agent) => self.by_agent(agent),
            None => self.all(),
        };
        skills.sort_by(|a, b| a.name.cmp(&b.name));

        if skills.is_empty() {
            return "No skills available.".to_string();
        }

        let mut lines = vec!["Available skills:".to_string()];
        for skill in skills {
            lines.push(format!("  - {}: {}", skill.signature(), skill.description));
        }
        lines.push("\n(* = required parameter)".to_string());
        lines.join("\n")
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.skills.len(),
            core: self.core_skills.len(),
            overrides: self.skills.values().filter(|s| s.overrides_core).count(),
            by_agent: self
                .by_agent
                .iter()
                .map(|(agent, names)| (agent.clone(), names.len()))
                .collect(),
            by_category: self
                .by_category
                .iter()
                .map(|(category, names)| (category.clone(), names.len()))
                .collect(),
        }
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Execute a skill by name with a JSON object of parameters.
    pub async fn execute(&self, name: &str, params: Value) -> Result<Value> {
        let skill = self
            .get(name)
            .ok_or_else(|| Error::skill_not_found(name))?;
        tracing::debug!(skill = name, "executing skill");
        skill.execute(params).await
    }
}

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Which LLM backend serves this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// A local HTTP server speaking the `/api/generate` protocol.
    LocalHttp,
    /// Deterministic canned responses, for tests and offline runs.
    Mock,
    /// A hosted cloud provider (requires an API key).
    HostedCloud,
}

/// The four logical model slots the runtime composes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSlots {
    /// High-level reasoning and planning. Large models with strong reasoning.
    pub reasoning: String,
    /// Structured JSON output. Smaller models that follow formats well.
    pub parser: String,
    /// Tool calling and code generation.
    pub tool: String,
    /// Vector embeddings for cold memory.
    pub embedding: String,
}

impl Default for ModelSlots {
    fn default() -> Self {
        Self {
            reasoning: "gpt-oss:20b".into(),
            parser: "llama3.1:8b".into(),
            tool: "llama3.1:8b".into(),
            embedding: "nomic-embed-text".into(),
        }
    }
}

/// Process-wide runtime configuration, loaded once and validated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub provider: Provider,
    /// Base URL for the local HTTP backend, without a `/v1` or `/api` suffix.
    pub base_url: String,
    pub models: ModelSlots,
    /// API key for the hosted provider.
    pub api_key: Option<Secret<String>>,
    /// Enables stage tracing detail and on-disk LLM transcript dumps.
    pub observability: bool,
    /// Gates the Actor's free-form command execution path. The `unsafe-exec`
    /// cargo feature must also be compiled in.
    pub allow_exec: bool,
    /// Root directory holding per-agent state (`<agents_root>/<name>/...`).
    pub agents_root: PathBuf,
    /// Root directory of universal core skills.
    pub core_skills_root: PathBuf,
    /// Dimension of the embedding model's vectors.
    pub embedding_dim: usize,
    /// WARM log compaction trigger: file size in KB.
    pub log_max_size_kb: u64,
    /// WARM log compaction trigger: uncompacted entry count.
    pub log_max_entries: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: Provider::LocalHttp,
            base_url: "http://127.0.0.1:11434".into(),
            models: ModelSlots::default(),
            api_key: None,
            observability: false,
            allow_exec: false,
            agents_root: PathBuf::from("./agents"),
            core_skills_root: PathBuf::from("./skills/core"),
            embedding_dim: 768,
            log_max_size_kb: 50,
            log_max_entries: 100,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `maestro.toml` (optional) layered under
    /// `MAESTRO__*` environment variables, e.g. `MAESTRO__MODELS__PARSER`.
    pub fn load() -> Result<Self> {
        let source = Config::builder()
            .add_source(File::with_name("maestro").required(false))
            .add_source(Environment::with_prefix("MAESTRO").separator("__"))
            .build()
            .map_err(|e| Error::config(e.to_string()))?;

        let mut cfg: RuntimeConfig = source
            .try_deserialize()
            .map_err(|e| Error::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate invariants and normalize the base URL.
    pub fn validate(&mut self) -> Result<()> {
        match self.provider {
            Provider::LocalHttp => {
                if self.base_url.trim().is_empty() {
                    return Err(Error::config(
                        "base_url must be set when provider is local-http",
                    ));
                }
                if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
                    return Err(Error::config(format!(
                        "base_url must be absolute (http:// or https://), got: {}",
                        self.base_url
                    )));
                }
                self.base_url = sanitize_base_url(&self.base_url);
            }
            Provider::HostedCloud => {
                let missing = self
                    .api_key
                    .as_ref()
                    .map(|k| k.expose_secret().trim().is_empty())
                    .unwrap_or(true);
                if missing {
                    return Err(Error::config(
                        "api_key must be set when provider is hosted-cloud",
                    ));
                }
            }
            Provider::Mock => {}
        }
        Ok(())
    }

    /// Memory directory for one agent: `<agents_root>/<name>/memory`.
    pub fn memory_dir(&self, agent_name: &str) -> PathBuf {
        self.agents_root.join(agent_name).join("memory")
    }

    /// Skill directory for one agent: `<agents_root>/<name>/skills`.
    pub fn agent_skills_dir(&self, agent_name: &str) -> PathBuf {
        self.agents_root.join(agent_name).join("skills")
    }
}

/// Strip trailing slashes and a `/v1` or `/api` suffix from a base URL.
fn sanitize_base_url(url: &str) -> String {
    let mut base = url.trim_end_matches('/');
    for suffix in ["/v1", "/api"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped;
            break;
        }
    }
    base.trim_end_matches('/').to_string()
}

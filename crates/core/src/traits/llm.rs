//! LLM client interface.

use async_trait::async_trait;

use crate::error::Result;

/// Uniform text-completion and embedding interface over one backend.
///
/// The runtime addresses models by name through the four configured slots
/// (reasoning, parser, tool, embedding); a client serves all of them.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion. With `json_mode` the backend is asked for JSON
    /// output and the response is guaranteed to parse as a JSON document.
    async fn generate(&self, model: &str, prompt: &str, json_mode: bool) -> Result<String>;

    /// Generate an embedding vector for `text`.
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;
}

//! Local HTTP backend speaking the `/api/generate` + `/api/embeddings`
//! protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use maestro_core::{
    error::{Error, Result},
    traits::LlmClient,
};

/// Per-call timeouts. Reasoning-class generations run for minutes on local
/// hardware; JSON structuring and embeddings are much quicker.
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub generate: Duration,
    pub json: Duration,
    pub embed: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            generate: Duration::from_secs(180),
            json: Duration::from_secs(45),
            embed: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Client for a local model server (Ollama-compatible wire format).
pub struct HttpLlmClient {
    base_url: String,
    http: reqwest::Client,
    timeouts: Timeouts,
}

impl HttpLlmClient {
    /// Create a client for `base_url` (already sanitized by config loading).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeouts(base_url, Timeouts::default())
    }

    pub fn with_timeouts(base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            timeouts,
        }
    }

    fn map_request_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::LlmTimeout(e.to_string())
        } else if e.is_status() {
            Error::LlmModel(e.to_string())
        } else {
            Error::llm_transport(e.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, model: &str, prompt: &str, json_mode: bool) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let timeout = if json_mode {
            self.timeouts.json
        } else {
            self.timeouts.generate
        };

        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            format: json_mode.then_some("json"),
        };

        tracing::debug!(model, json_mode, prompt_len = prompt.len(), "LLM generate");

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::LlmModel(format!(
                "model server returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::llm_protocol(format!("malformed generate response: {}", e)))?;

        if json_mode {
            serde_json::from_str::<serde_json::Value>(&envelope.response).map_err(|e| {
                Error::llm_protocol(format!("json-mode response is not valid JSON: {}", e))
            })?;
        }

        Ok(envelope.response)
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbedRequest {
            model,
            prompt: text,
        };

        let response = self
            .http
            .post(&url)
            .timeout(self.timeouts.embed)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            return Err(Error::LlmModel(format!(
                "embedding server returned {}",
                response.status()
            )));
        }

        let envelope: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::llm_protocol(format!("malformed embedding response: {}", e)))?;

        Ok(envelope.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_wire_shape() {
        let plain = GenerateRequest {
            model: "llama3.1:8b",
            prompt: "hi",
            stream: false,
            format: None,
        };
        let json = serde_json::to_value(&plain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama3.1:8b", "prompt": "hi", "stream": false})
        );

        let structured = GenerateRequest {
            format: Some("json"),
            ..plain
        };
        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["format"], "json");
    }

    #[test]
    fn test_timeout_floors() {
        let t = Timeouts::default();
        assert!(t.generate >= Duration::from_secs(120));
        assert!(t.json >= Duration::from_secs(30));
    }
}

//! Error types for maestro.

use thiserror::Error;

/// Result type alias using maestro's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for maestro.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // LLM client
    // =========================================================================
    #[error("LLM call timed out: {0}")]
    LlmTimeout(String),

    #[error("LLM transport error: {0}")]
    LlmTransport(String),

    #[error("LLM protocol error: {0}")]
    LlmProtocol(String),

    #[error("LLM model error: {0}")]
    LlmModel(String),

    // =========================================================================
    // Planning
    // =========================================================================
    #[error("Plan failed validation: {0}")]
    PlanInvalid(String),

    // =========================================================================
    // Skills
    // =========================================================================
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Missing required parameter '{parameter}' for skill '{skill}'")]
    MissingParameter { skill: String, parameter: String },

    #[error("Skill '{0}' has no runtime hook")]
    SkillNoRuntime(String),

    #[error("Skill execution failed: {0}")]
    SkillExecution(String),

    // =========================================================================
    // Memory
    // =========================================================================
    #[error("Memory error: {0}")]
    Memory(String),

    // =========================================================================
    // Generic
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an LLM transport error.
    pub fn llm_transport(msg: impl Into<String>) -> Self {
        Self::LlmTransport(msg.into())
    }

    /// Create an LLM protocol error.
    pub fn llm_protocol(msg: impl Into<String>) -> Self {
        Self::LlmProtocol(msg.into())
    }

    /// Create a plan validation error.
    pub fn plan_invalid(msg: impl Into<String>) -> Self {
        Self::PlanInvalid(msg.into())
    }

    /// Create a skill-not-found error.
    pub fn skill_not_found(name: impl Into<String>) -> Self {
        Self::SkillNotFound(name.into())
    }

    /// Create a skill execution error.
    pub fn skill_execution(msg: impl Into<String>) -> Self {
        Self::SkillExecution(msg.into())
    }

    /// Create a memory error.
    pub fn memory(msg: impl Into<String>) -> Self {
        Self::Memory(msg.into())
    }
}

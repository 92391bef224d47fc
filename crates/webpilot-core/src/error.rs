//! Error types for webpilot-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] webpilot_llm::Error),

    /// Browser or tool error
    #[error("tool error: {0}")]
    Tool(#[from] webpilot_tools::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A guardrail refused the request
    #[error("guardrail: {0}")]
    Guardrail(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

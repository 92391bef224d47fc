//! OpenRouter - Multi-provider LLM Gateway
//!
//! OpenAI-compatible chat completions with function calling, routed to any
//! model OpenRouter exposes.

/// OpenRouter provider implementation
pub mod provider;
/// OpenRouter API and configuration types
pub mod types;

#[cfg(test)]
mod tests;

pub use provider::OpenRouterProvider;
pub use types::{OpenRouterConfig, BASE_URL, DEFAULT_MODEL};

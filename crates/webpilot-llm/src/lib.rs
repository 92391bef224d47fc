//! WebPilot LLM - LLM Provider Abstraction
//!
//! This crate provides the language-model side of the browser agent:
//! - Message, tool-call and completion types shared by every provider
//! - `LlmProvider`: the trait the agent loop talks to
//! - OpenRouter: OpenAI-compatible multi-model gateway
//! - Mock: scripted provider for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openrouter;
pub mod provider;
pub mod tools;
pub mod util;

pub use completion::{CompletionRequest, TokenUsage, ToolCompletionRequest, ToolCompletionResponse};
pub use error::{is_fatal_message, Error, Result, FATAL_INDICATORS};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use openrouter::{OpenRouterConfig, OpenRouterProvider};
pub use provider::LlmProvider;
pub use tools::{ToolCall, ToolChoice, ToolDefinition};

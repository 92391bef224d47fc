//! WebPilot Core - Browser Agent Engine
//!
//! This crate drives a browser from a natural-language task:
//! - Orchestrator: the ask-model, screen, execute, decide loop
//! - Guardrails: input, tool and output screening over rule tables
//! - Executor: runs one tool call against the browser and returns text
//! - Waits: bounded captcha and login hand-off to the user
//! - Interaction: the input port used for confirmations and questions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod executor;
pub mod guardrails;
pub mod interaction;
pub mod orchestrator;
pub mod waits;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::{Error, Result};
pub use executor::{ExecutorConfig, ToolExecutor};
pub use guardrails::{
    GuardrailConfig, GuardrailPipeline, GuardrailVerdict, RiskLevel, RuleSet, ScreeningReport,
};
pub use interaction::InputPort;
pub use orchestrator::{
    AbortReason, ActionHistory, ActionRecord, Conversation, Orchestrator, OrchestratorConfig,
    RunState, TaskOutcome, TaskStatus,
};
pub use waits::{ChallengeWatcher, WaitOutcome, WaitPolicy};

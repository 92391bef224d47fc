//! Orchestrator - the task loop
//!
//! Asks the model for the next action, screens and executes it, folds the
//! result back into the conversation and decides whether to stop.
//!
//! # Module Structure
//!
//! - `types`: run outcome, state machine, conversation and action history
//! - `config`: `OrchestratorConfig` and the default system prompt
//! - `core`: `Orchestrator` struct and constructors
//! - `process`: the main loop
//! - `heuristics`: completion and error text signals

mod config;
mod core;
pub mod heuristics;
mod process;
mod types;


pub use config::{OrchestratorConfig, DEFAULT_SYSTEM_PROMPT};
pub use core::Orchestrator;
pub use types::{
    canonical_json, AbortReason, ActionHistory, ActionRecord, Conversation, RunState,
    TaskOutcome, TaskStatus,
};

//! Test doubles for the agent
//!
//! [`ScriptedInput`] stands in for the terminal: answers, confirmations and
//! cancel presses are queued up front and every prompt and notice is
//! recorded. The in-memory browser lives in `webpilot_tools::testing` and is
//! re-exported here.

use crate::interaction::InputPort;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use webpilot_tools::testing::{FakeBrowser, FakeElement};

#[derive(Default)]
struct Script {
    answers: VecDeque<Option<String>>,
    confirmations: VecDeque<bool>,
    cancels: VecDeque<bool>,
    prompts: Vec<String>,
    notifications: Vec<String>,
}

/// Scripted [`InputPort`]
///
/// Once a queue runs dry the port answers "closed input", "no" and
/// "no cancel" respectively.
#[derive(Default)]
pub struct ScriptedInput {
    script: Mutex<Script>,
}

impl ScriptedInput {
    /// Port with empty queues
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an answer line
    #[must_use]
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        self.script().answers.push_back(Some(answer.into()));
        self
    }

    /// Queue an end-of-input
    #[must_use]
    pub fn with_closed_input(self) -> Self {
        self.script().answers.push_back(None);
        self
    }

    /// Queue a yes/no confirmation
    #[must_use]
    pub fn with_confirmation(self, accept: bool) -> Self {
        self.script().confirmations.push_back(accept);
        self
    }

    /// Queue cancel-key polls; `true` means the key was pressed
    #[must_use]
    pub fn with_cancels(self, presses: impl IntoIterator<Item = bool>) -> Self {
        self.script().cancels.extend(presses);
        self
    }

    /// Every prompt shown, in order
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.script().prompts.clone()
    }

    /// Every notice shown, in order
    #[must_use]
    pub fn notifications(&self) -> Vec<String> {
        self.script().notifications.clone()
    }
}

#[async_trait]
impl InputPort for ScriptedInput {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        let mut script = self.script();
        script.prompts.push(prompt.to_string());
        script.answers.pop_front().flatten()
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let mut script = self.script();
        script.prompts.push(prompt.to_string());
        script.confirmations.pop_front().unwrap_or(false)
    }

    async fn cancel_requested(&self, window: Duration) -> bool {
        let pressed = self.script().cancels.pop_front().unwrap_or(false);
        if !pressed {
            tokio::time::sleep(window).await;
        }
        pressed
    }

    fn notify(&self, message: &str) {
        self.script().notifications.push(message.to_string());
    }
}

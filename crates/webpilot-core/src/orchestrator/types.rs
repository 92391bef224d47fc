//! Orchestrator types
//!
//! - `TaskOutcome`, `TaskStatus`, `AbortReason` for run results
//! - `RunState` for the loop's state machine
//! - `Conversation` for the append-only message log
//! - `ActionRecord` and `ActionHistory` for repetition detection

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use webpilot_llm::Message;

// ============================================================================
// Outcome
// ============================================================================

/// Why a run stopped without completing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The same tool call was issued three times in a row
    RepeatedAction,
    /// Too many recent messages carry an error
    TooManyErrors,
    /// The provider refused service (quota, balance, permission)
    ProviderFatal,
    /// The iteration budget ran out
    IterationLimit,
}

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The agent finished the task
    Completed,
    /// The loop stopped early
    Aborted(AbortReason),
    /// Input screening refused the task
    Blocked,
}

/// Result of [`Orchestrator::run`](super::Orchestrator::run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Final status
    pub status: TaskStatus,
    /// Text shown to the user
    pub result: String,
    /// Iterations used
    pub iterations: usize,
}

impl TaskOutcome {
    /// Whether the task was completed
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// State of a running task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Asking the model and executing its calls
    Running,
    /// Waiting for the user to answer an `ask_user` question
    AwaitingUserAnswer,
    /// Finished with a result
    Completed,
    /// Stopped early
    Aborted,
}

impl RunState {
    /// No transitions leave this state
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::AwaitingUserAnswer => "awaiting_user_answer",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Append-only message log sent to the model on every iteration
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start with the system prompt and the task
    #[must_use]
    pub fn new(system_prompt: &str, task: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(task)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages
    #[must_use]
    pub fn tail(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ============================================================================
// Repetition detection
// ============================================================================

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// JSON with object keys sorted at every level
#[must_use]
pub fn canonical_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// A tool call reduced to its name and canonical arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionRecord {
    /// Tool name
    pub name: String,
    /// Arguments as canonical JSON
    pub canonical_args: String,
}

impl ActionRecord {
    /// Record a call
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: &serde_json::Value) -> Self {
        Self {
            name: name.into(),
            canonical_args: canonical_json(arguments),
        }
    }
}

impl fmt::Display for ActionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.canonical_args)
    }
}

/// Bounded ring of recent calls plus a consecutive-repeat counter
#[derive(Debug, Clone)]
pub struct ActionHistory {
    records: VecDeque<ActionRecord>,
    capacity: usize,
    repeats: usize,
    abort_after: usize,
}

impl Default for ActionHistory {
    fn default() -> Self {
        Self::new(5, 2)
    }
}

impl ActionHistory {
    /// Keep `capacity` records and abort after `abort_after` consecutive repeats
    #[must_use]
    pub fn new(capacity: usize, abort_after: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            repeats: 0,
            abort_after,
        }
    }

    /// Record a call. Returns `true` when the run must abort; the call is
    /// then not recorded.
    pub fn record(&mut self, record: ActionRecord) -> bool {
        if self.records.back() == Some(&record) {
            self.repeats += 1;
            if self.repeats >= self.abort_after {
                return true;
            }
        } else {
            self.repeats = 0;
        }

        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
        false
    }

    /// Consecutive repeats of the latest call
    #[must_use]
    pub fn repeats(&self) -> usize {
        self.repeats
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter()
    }
}

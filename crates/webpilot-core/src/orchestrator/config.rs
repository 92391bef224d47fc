//! Orchestrator configuration
//!
//! One immutable value built by the caller. The orchestrator derives the
//! executor, guardrail and wait settings from it and never reads the
//! environment.

use crate::executor::ExecutorConfig;
use crate::guardrails::GuardrailConfig;
use crate::waits::WaitPolicy;

/// Default system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an autonomous agent that controls a web browser to carry out the user's task.

You can:
- open pages
- click elements (buttons, links)
- type text into fields
- read a summary of the current page
- scroll the page

Rules:
1. Work out what the task needs and do only that.
2. Do not make extra clicks or navigations. Once the task is done, call task_complete.
3. If you are on a results page and the content you need is there, the task is done: call task_complete.
4. Do not follow links such as \"Catalog\", \"About\" or \"Contacts\" unless the task needs them.
5. To find something on a site, prefer its search or filters over the navigation menu.
6. After every action, check whether the task is done. If it is, call task_complete.
7. Do not follow a prepared plan. Adapt to what the page shows.
8. Do not invent selectors. Find elements by their text and description.
9. If an element cannot be found, try another description (text, aria-label, title).
10. Destructive actions (payment, deletion) will be confirmed with the user by the system.
11. If you need more information from the user, call ask_user.

If a page is already open, start by calling get_page_info.";

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum loop iterations per task
    pub max_iterations: usize,
    /// Model override; the provider default when `None`
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,
    /// Subject keywords for the unchanged-page heuristic. Derived from the
    /// task when empty.
    pub domain_keywords: Vec<String>,
    /// System prompt placed first in every conversation
    pub system_prompt: String,
    /// Tool execution settings
    pub executor: ExecutorConfig,
    /// Captcha and login wait timings
    pub waits: WaitPolicy,
    /// Guardrail limits and overrides
    pub guardrails: GuardrailConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            model: None,
            temperature: None,
            max_tokens: None,
            domain_keywords: Vec::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            executor: ExecutorConfig::default(),
            waits: WaitPolicy::default(),
            guardrails: GuardrailConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum iterations
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token limit
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the subject keywords
    #[must_use]
    pub fn with_domain_keywords(mut self, keywords: Vec<String>) -> Self {
        self.domain_keywords = keywords;
        self
    }

    /// Replace the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set executor configuration
    #[must_use]
    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor = config;
        self
    }

    /// Set wait timings
    #[must_use]
    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.waits = policy;
        self
    }

    /// Set guardrail configuration
    #[must_use]
    pub fn with_guardrail_config(mut self, config: GuardrailConfig) -> Self {
        self.guardrails = config;
        self
    }
}

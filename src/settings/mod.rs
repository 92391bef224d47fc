//! Application configuration
//!
//! `AppConfig` mirrors `config/default.toml` section by section and is
//! converted once into the immutable values the library crates take.

mod loader;

pub use loader::{api_key, load_config, DEFAULT_CONFIG};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use webpilot_core::{ExecutorConfig, GuardrailConfig, OrchestratorConfig, WaitPolicy};
use webpilot_llm::OpenRouterConfig;
use webpilot_tools::BrowserConfig;

/// Application name reported to OpenRouter
const APP_NAME: &str = "webpilot";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// LLM provider settings
    pub llm: LlmSettings,
    /// Browser session settings
    pub browser: BrowserConfig,
    /// Agent loop settings
    pub agent: AgentSettings,
    /// Captcha and login wait settings
    pub waits: WaitSettings,
    /// Guardrail limits
    pub guardrails: GuardrailConfig,
}

/// LLM provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model identifier, e.g. `openai/gpt-4o-mini`
    pub model: String,
    /// OpenAI-compatible API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens per completion
    pub max_tokens: Option<u32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: webpilot_llm::openrouter::DEFAULT_MODEL.to_string(),
            base_url: webpilot_llm::openrouter::BASE_URL.to_string(),
            timeout_secs: 120,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Agent loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Iteration cap per task
    pub max_iterations: usize,
    /// Run HIGH-risk actions without asking
    pub auto_confirm_destructive: bool,
    /// Subject keywords for the unchanged-page check
    pub domain_keywords: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            auto_confirm_destructive: false,
            domain_keywords: Vec::new(),
        }
    }
}

/// Captcha and login wait settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    /// Longest wait for a captcha to be solved
    pub captcha_timeout_secs: u64,
    /// Longest wait for a manual login
    pub login_timeout_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            captcha_timeout_secs: 300,
            login_timeout_secs: 600,
        }
    }
}

impl AppConfig {
    /// Build the orchestrator configuration
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let executor = ExecutorConfig::new()
            .with_auto_confirm(self.agent.auto_confirm_destructive)
            .with_navigation_timeout(self.browser.navigation_timeout());
        let waits = WaitPolicy::new()
            .with_captcha_timeout(Duration::from_secs(self.waits.captcha_timeout_secs))
            .with_login_timeout(Duration::from_secs(self.waits.login_timeout_secs));

        let mut config = OrchestratorConfig::new()
            .with_max_iterations(self.agent.max_iterations)
            .with_model(self.llm.model.clone())
            .with_domain_keywords(self.agent.domain_keywords.clone())
            .with_executor_config(executor)
            .with_wait_policy(waits)
            .with_guardrail_config(self.guardrails.clone());
        if let Some(temperature) = self.llm.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.llm.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }

    /// Build the OpenRouter provider configuration
    #[must_use]
    pub fn openrouter_config(&self, api_key: impl Into<String>) -> OpenRouterConfig {
        let mut config = OpenRouterConfig::new(api_key)
            .with_base_url(self.llm.base_url.clone())
            .with_model(self.llm.model.clone())
            .with_timeout(Duration::from_secs(self.llm.timeout_secs))
            .with_app_name(APP_NAME);
        if let Some(temperature) = self.llm.temperature {
            config = config.with_temperature(temperature);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};
    use webpilot_core::RiskLevel;

    fn parse(extra: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(extra, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_embedded_defaults() {
        let config = parse("");
        assert_eq!(config.llm.model, "openai/gpt-4o-mini");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.navigation_timeout_ms, 60_000);
        assert_eq!(config.agent.max_iterations, 50);
        assert!(!config.agent.auto_confirm_destructive);
        assert_eq!(config.waits.captcha_timeout_secs, 300);
        assert_eq!(config.waits.login_timeout_secs, 600);
        assert_eq!(config.guardrails.max_input_length, 10_000);
        assert_eq!(config.guardrails.max_output_length, 50_000);
        assert!(config.guardrails.tool_risk_overrides.is_empty());
    }

    #[test]
    fn test_file_overrides() {
        let config = parse(
            r#"
            [agent]
            max_iterations = 10
            auto_confirm_destructive = true
            domain_keywords = ["laptop"]

            [guardrails]
            extra_blocked_terms = ["casino"]

            [guardrails.tool_risk_overrides]
            ask_user = "critical"
            "#,
        );
        assert_eq!(config.agent.max_iterations, 10);
        assert!(config.agent.auto_confirm_destructive);
        assert_eq!(config.agent.domain_keywords, vec!["laptop".to_string()]);
        assert_eq!(config.guardrails.extra_blocked_terms, vec!["casino".to_string()]);
        assert_eq!(
            config.guardrails.tool_risk_overrides.get("ask_user"),
            Some(&RiskLevel::Critical)
        );
    }

    #[test]
    fn test_orchestrator_config_conversion() {
        let mut config = parse("");
        config.agent.max_iterations = 7;
        config.agent.auto_confirm_destructive = true;
        config.waits.captcha_timeout_secs = 30;
        config.llm.temperature = Some(0.3);

        let orchestrator = config.orchestrator_config();
        assert_eq!(orchestrator.max_iterations, 7);
        assert_eq!(orchestrator.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(orchestrator.temperature, Some(0.3));
        assert!(orchestrator.max_tokens.is_none());
        assert!(orchestrator.executor.auto_confirm_destructive);
        assert_eq!(orchestrator.waits.captcha_timeout, Duration::from_secs(30));
        assert_eq!(orchestrator.waits.login_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_openrouter_config_conversion() {
        let mut config = parse("");
        config.llm.model = "anthropic/claude-3.5-sonnet".to_string();
        config.llm.timeout_secs = 30;

        let openrouter = config.openrouter_config("sk-or-test-key-1234567890");
        assert_eq!(openrouter.default_model, "anthropic/claude-3.5-sonnet");
        assert_eq!(openrouter.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(openrouter.timeout, Duration::from_secs(30));
        assert_eq!(openrouter.app_name.as_deref(), Some("webpilot"));
        assert!(!format!("{openrouter:?}").contains("1234567890"));
    }
}

//! Orchestrator core structure
//!
//! Contains the main `Orchestrator` struct and its builder methods.

use crate::error::Result;
use crate::executor::ToolExecutor;
use crate::guardrails::GuardrailPipeline;
use crate::interaction::InputPort;
use std::sync::Arc;
use tracing::info;
use webpilot_llm::LlmProvider;
use webpilot_tools::{Browser, PageAnalyzer};

use super::config::OrchestratorConfig;

/// Drives one browser through tasks, one at a time
pub struct Orchestrator {
    pub(crate) provider: Arc<dyn LlmProvider>,
    pub(crate) browser: Arc<dyn Browser>,
    pub(crate) input: Arc<dyn InputPort>,
    pub(crate) guardrails: Arc<GuardrailPipeline>,
    pub(crate) executor: ToolExecutor,
    pub(crate) config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        browser: Arc<dyn Browser>,
        input: Arc<dyn InputPort>,
        config: OrchestratorConfig,
    ) -> Self {
        let guardrails = Arc::new(GuardrailPipeline::new(config.guardrails.clone()));
        let executor = ToolExecutor::new(
            browser.clone(),
            input.clone(),
            guardrails.clone(),
            config.waits,
            config.executor.clone(),
        );

        info!(
            provider = provider.name(),
            max_iterations = config.max_iterations,
            "Orchestrator ready"
        );

        Self {
            provider,
            browser,
            input,
            guardrails,
            executor,
            config,
        }
    }

    /// Replace the page analyzer used by `get_page_info`
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn PageAnalyzer>) -> Self {
        self.executor = self.executor.with_analyzer(analyzer);
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Guardrail pipeline in use
    #[must_use]
    pub fn guardrails(&self) -> &GuardrailPipeline {
        &self.guardrails
    }

    /// Provider name
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Close the browser session
    pub async fn shutdown(&self) -> Result<()> {
        info!("Closing browser session");
        self.browser.close().await?;
        Ok(())
    }
}

//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Environment variable holding the OpenRouter key
const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Environment variable overriding `llm.model`
const MODEL_VAR: &str = "OPENROUTER_MODEL";

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. Local overrides (optional)
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") makes WEBPILOT_AGENT__MAX_ITERATIONS work.
        .add_source(
            Environment::with_prefix("WEBPILOT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("agent.domain_keywords")
                .with_list_parse_key("guardrails.extra_blocked_terms")
                .with_list_parse_key("browser.args")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    if let Some(model) = non_empty_var(MODEL_VAR) {
        app.llm.model = model;
    }

    Ok(app)
}

/// Read the OpenRouter API key from the environment
pub fn api_key() -> Result<String> {
    non_empty_var(API_KEY_VAR).with_context(|| {
        format!("{API_KEY_VAR} is not set. Add it to .env or export it before starting webpilot.")
    })
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

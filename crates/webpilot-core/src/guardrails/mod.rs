//! Guardrail pipeline
//!
//! Three screening surfaces share one set of rule tables:
//!
//! - **Input** (the task text): relevance → jailbreak → injection →
//!   moderation → rules. The first blocking verdict stops the chain;
//!   non-blocking findings accumulate.
//! - **Tool** (every call, before execution): static risk table plus
//!   argument scans. CRITICAL blocks, HIGH needs confirmation.
//! - **Output** (assistant text and final results): PII, brand safety and
//!   rules. Only a forbidden term can block.

pub mod classifiers;
pub mod rules;


use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

pub use rules::{CompiledPattern, RuleSet};

// ============================================================================
// Verdicts
// ============================================================================

/// Ordinal severity of a finding
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Harmless
    #[default]
    Low,
    /// Worth noting
    Medium,
    /// Needs the user's confirmation
    High,
    /// Never allowed
    Critical,
}

impl RiskLevel {
    /// Lower-case name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    /// Nothing was found
    pub passed: bool,
    /// Severity of what was found, or the tool's base risk
    pub risk_level: RiskLevel,
    /// Human-readable explanation, empty when passed
    pub reason: String,
    /// Processing must stop
    pub blocked: bool,
}

impl GuardrailVerdict {
    /// Nothing found
    #[must_use]
    pub fn pass() -> Self {
        Self::pass_at(RiskLevel::Low)
    }

    /// Nothing found, with a known base risk
    #[must_use]
    pub fn pass_at(risk_level: RiskLevel) -> Self {
        Self {
            passed: true,
            risk_level,
            reason: String::new(),
            blocked: false,
        }
    }

    /// A finding that is reported but does not stop processing
    #[must_use]
    pub fn flag(risk_level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            risk_level,
            reason: reason.into(),
            blocked: false,
        }
    }

    /// A finding that stops processing
    #[must_use]
    pub fn block(risk_level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            risk_level,
            reason: reason.into(),
            blocked: true,
        }
    }

    /// Passed and not blocked
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.passed && !self.blocked
    }

    /// Not blocked, but the user must agree before the call runs
    #[must_use]
    pub fn needs_confirmation(&self) -> bool {
        !self.passed && !self.blocked && self.risk_level >= RiskLevel::High
    }
}

/// Findings of a multi-classifier screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreeningReport {
    /// Every verdict that did not pass, in chain order
    pub findings: Vec<GuardrailVerdict>,
}

impl ScreeningReport {
    /// No findings at all
    #[must_use]
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// A finding blocked further processing
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.findings.iter().any(|v| v.blocked)
    }

    /// Reasons of all findings
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.findings.iter().map(|v| v.reason.clone()).collect()
    }

    /// Highest risk among findings
    #[must_use]
    pub fn max_risk(&self) -> Option<RiskLevel> {
        self.findings.iter().map(|v| v.risk_level).max()
    }

    fn push(&mut self, verdict: GuardrailVerdict) -> bool {
        let blocked = verdict.blocked;
        if !verdict.passed {
            self.findings.push(verdict);
        }
        blocked
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Guardrail limits and overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Maximum task length in characters
    pub max_input_length: usize,
    /// Maximum output length in characters before it is reported
    pub max_output_length: usize,
    /// Forbidden terms added to the built-in list
    pub extra_blocked_terms: Vec<String>,
    /// Per-tool risk levels replacing the static table
    pub tool_risk_overrides: HashMap<String, RiskLevel>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_input_length: 10_000,
            max_output_length: 50_000,
            extra_blocked_terms: Vec::new(),
            tool_risk_overrides: HashMap::new(),
        }
    }
}

impl GuardrailConfig {
    /// Create a config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input length limit
    #[must_use]
    pub fn with_max_input_length(mut self, max: usize) -> Self {
        self.max_input_length = max;
        self
    }

    /// Set the output length limit
    #[must_use]
    pub fn with_max_output_length(mut self, max: usize) -> Self {
        self.max_output_length = max;
        self
    }

    /// Add a forbidden term
    #[must_use]
    pub fn with_blocked_term(mut self, term: impl Into<String>) -> Self {
        self.extra_blocked_terms.push(term.into());
        self
    }

    /// Override a tool's static risk level
    #[must_use]
    pub fn with_tool_risk(mut self, tool: impl Into<String>, level: RiskLevel) -> Self {
        self.tool_risk_overrides.insert(tool.into(), level);
        self
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Screens task text, tool calls and output
#[derive(Debug, Clone)]
pub struct GuardrailPipeline {
    config: GuardrailConfig,
    rules: RuleSet,
}

impl GuardrailPipeline {
    /// Create a pipeline over the built-in rule tables
    #[must_use]
    pub fn new(config: GuardrailConfig) -> Self {
        let rules = RuleSet::builtin().with_blocked_terms(&config.extra_blocked_terms);
        Self { config, rules }
    }

    /// Create a pipeline over custom rule tables
    #[must_use]
    pub fn with_rules(config: GuardrailConfig, rules: RuleSet) -> Self {
        let rules = rules.with_blocked_terms(&config.extra_blocked_terms);
        Self { config, rules }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Screen a task before the agent starts on it
    pub fn check_input(&self, text: &str) -> ScreeningReport {
        let mut report = ScreeningReport::default();
        let chain = [
            classifiers::relevance,
            classifiers::jailbreak,
            classifiers::injection,
            classifiers::moderation,
        ];

        for classifier in chain {
            if report.push(classifier(text, &self.rules)) {
                return self.logged("input", report);
            }
        }
        report.push(classifiers::input_rules(
            text,
            self.config.max_input_length,
            &self.rules,
        ));
        self.logged("input", report)
    }

    /// Screen one tool call before it runs
    pub fn check_tool(&self, name: &str, arguments: &serde_json::Value) -> GuardrailVerdict {
        let verdict = classifiers::tool_risk(
            name,
            arguments,
            &self.config.tool_risk_overrides,
            &self.rules,
        );
        if verdict.blocked {
            warn!(tool = name, risk = %verdict.risk_level, reason = %verdict.reason, "Tool call blocked");
        } else if !verdict.passed {
            debug!(tool = name, risk = %verdict.risk_level, reason = %verdict.reason, "Tool call needs confirmation");
        }
        verdict
    }

    /// Screen model output or a final result
    pub fn check_output(&self, text: &str) -> ScreeningReport {
        let mut report = ScreeningReport::default();
        report.push(classifiers::pii(text, &self.rules));
        report.push(classifiers::brand_safety(text, &self.rules));
        report.push(classifiers::output_rules(
            text,
            self.config.max_output_length,
            &self.rules,
        ));
        self.logged("output", report)
    }

    fn logged(&self, surface: &str, report: ScreeningReport) -> ScreeningReport {
        for finding in &report.findings {
            if finding.blocked {
                warn!(surface, risk = %finding.risk_level, reason = %finding.reason, "Guardrail blocked");
            } else {
                debug!(surface, risk = %finding.risk_level, reason = %finding.reason, "Guardrail finding");
            }
        }
        report
    }
}

impl Default for GuardrailPipeline {
    fn default() -> Self {
        Self::new(GuardrailConfig::default())
    }
}

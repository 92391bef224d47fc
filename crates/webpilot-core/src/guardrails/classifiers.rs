//! Guardrail classifiers
//!
//! Pure functions from text to a [`GuardrailVerdict`]. Each one reads a single
//! table from the [`RuleSet`] and knows nothing about the others; the pipeline
//! decides how they chain.

use super::rules::RuleSet;
use super::{GuardrailVerdict, RiskLevel};
use std::collections::HashMap;

/// Off-topic requests, unless the text also mentions the browser or a page
pub fn relevance(text: &str, rules: &RuleSet) -> GuardrailVerdict {
    let lowered = text.to_lowercase();
    if rules.browser_context.iter().any(|t| lowered.contains(t)) {
        return GuardrailVerdict::pass();
    }
    match rules.off_topic.iter().find(|k| lowered.contains(k.as_str())) {
        Some(keyword) => GuardrailVerdict::block(
            RiskLevel::Low,
            format!("Request is not a browser task: {keyword}"),
        ),
        None => GuardrailVerdict::pass(),
    }
}

/// Attempts to override or extract the agent's instructions
pub fn jailbreak(text: &str, rules: &RuleSet) -> GuardrailVerdict {
    if rules.jailbreak.iter().any(|p| p.regex.is_match(text)) {
        GuardrailVerdict::block(
            RiskLevel::High,
            "Jailbreak or instruction-override attempt detected",
        )
    } else {
        GuardrailVerdict::pass()
    }
}

/// Script, shell and code execution payloads
pub fn injection(text: &str, rules: &RuleSet) -> GuardrailVerdict {
    match rules.injection.iter().find(|p| p.regex.is_match(text)) {
        Some(pattern) => GuardrailVerdict::block(
            RiskLevel::Critical,
            format!(
                "Prompt injection or code execution attempt detected: {}",
                pattern.label
            ),
        ),
        None => GuardrailVerdict::pass(),
    }
}

/// Hate, harassment and violence keywords
pub fn moderation(text: &str, rules: &RuleSet) -> GuardrailVerdict {
    match rules.moderation.iter().find(|c| c.regex.is_match(text)) {
        Some(category) => GuardrailVerdict::block(RiskLevel::High, category.label.clone()),
        None => GuardrailVerdict::pass(),
    }
}

fn forbidden_term(text: &str, rules: &RuleSet) -> Option<GuardrailVerdict> {
    let lowered = text.to_lowercase();
    rules
        .blocked_terms
        .iter()
        .find(|term| lowered.contains(term.as_str()))
        .map(|term| {
            GuardrailVerdict::block(RiskLevel::High, format!("Forbidden term detected: {term}"))
        })
}

/// Length limit and forbidden terms on input. Both block.
pub fn input_rules(text: &str, max_length: usize, rules: &RuleSet) -> GuardrailVerdict {
    let length = text.chars().count();
    if length > max_length {
        return GuardrailVerdict::block(
            RiskLevel::Medium,
            format!("Input too long: {length} > {max_length}"),
        );
    }
    forbidden_term(text, rules).unwrap_or_else(GuardrailVerdict::pass)
}

/// Length limit and forbidden terms on output. Only a forbidden term blocks.
pub fn output_rules(text: &str, max_length: usize, rules: &RuleSet) -> GuardrailVerdict {
    let length = text.chars().count();
    if length > max_length {
        return GuardrailVerdict::flag(
            RiskLevel::Medium,
            format!("Output too long: {length} > {max_length}"),
        );
    }
    forbidden_term(text, rules).unwrap_or_else(GuardrailVerdict::pass)
}

/// Personal data in output. Reported, never blocks.
pub fn pii(text: &str, rules: &RuleSet) -> GuardrailVerdict {
    let found: Vec<String> = rules
        .pii
        .iter()
        .filter_map(|p| {
            let count = p.regex.find_iter(text).count();
            (count > 0).then(|| format!("{}: {count} match(es)", p.label))
        })
        .collect();

    if found.is_empty() {
        GuardrailVerdict::pass()
    } else {
        GuardrailVerdict::flag(
            RiskLevel::Medium,
            format!("Personal data detected: {}", found.join(", ")),
        )
    }
}

/// Brand-safety phrases in output. Reported, never blocks.
pub fn brand_safety(text: &str, rules: &RuleSet) -> GuardrailVerdict {
    let lowered = text.to_lowercase();
    match rules.brand.iter().find(|t| lowered.contains(t.as_str())) {
        Some(term) => GuardrailVerdict::flag(
            RiskLevel::Medium,
            format!("Output may harm brand integrity: {term}"),
        ),
        None => GuardrailVerdict::pass(),
    }
}

/// Risk of one tool call.
///
/// CRITICAL blocks. HIGH is not passed and needs the user's confirmation.
/// Injection payloads in the arguments block regardless of the tool.
pub fn tool_risk(
    name: &str,
    arguments: &serde_json::Value,
    overrides: &HashMap<String, RiskLevel>,
    rules: &RuleSet,
) -> GuardrailVerdict {
    let base = overrides
        .get(name)
        .copied()
        .or_else(|| rules.tool_risk(name))
        .unwrap_or(RiskLevel::Medium);

    if base == RiskLevel::Critical {
        return GuardrailVerdict::block(
            RiskLevel::Critical,
            format!("Tool {name} has a critical risk level"),
        );
    }

    let args = arguments.to_string().to_lowercase();
    if let Some(pattern) = rules.injection.iter().find(|p| p.regex.is_match(&args)) {
        return GuardrailVerdict::block(
            RiskLevel::Critical,
            format!("Code injection pattern in arguments of {name}: {}", pattern.label),
        );
    }

    if base == RiskLevel::High {
        return GuardrailVerdict::flag(
            RiskLevel::High,
            format!("Tool {name} requires confirmation"),
        );
    }

    if let Some(keyword) = rules.destructive.iter().find(|k| args.contains(k.as_str())) {
        return GuardrailVerdict::flag(
            RiskLevel::High,
            format!("Destructive action detected: {keyword}"),
        );
    }

    GuardrailVerdict::pass_at(base)
}

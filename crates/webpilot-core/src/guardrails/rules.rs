//! Guardrail rule tables
//!
//! Every classifier is driven by one of the tables below. Regex tables are
//! compiled once into a [`RuleSet`]; a pattern that fails to compile is
//! skipped with a warning instead of disabling the whole stage.

use super::RiskLevel;
use regex::{Regex, RegexBuilder};
use tracing::warn;

// ============================================================================
// Input screening
// ============================================================================

/// Phrases that mark a request as outside the agent's job
pub const OFF_TOPIC_KEYWORDS: &[&str] = &[
    "empire state building",
    "historical facts",
    "math problem",
    "solve this equation",
    "laws of physics",
    "chemical formula",
    "tell me a joke",
    "write a poem",
    "высота эмпайр стейт билдинг",
    "сколько весит",
    "какая температура",
    "исторические факты",
    "математические задачи",
    "физические законы",
    "химические формулы",
];

/// Terms that put an otherwise off-topic request back in scope
pub const BROWSER_CONTEXT_TERMS: &[&str] = &[
    "browser", "page", "site", "website", "url", "http", "браузер", "страница", "сайт",
];

/// Instruction-override attempts
pub const JAILBREAK_PATTERNS: &[&str] = &[
    r"\bignore\b.*\bprevious\b.*\binstructions?\b",
    r"\bforget\b.*\brules\b",
    r"\bact\s+as\s+if\b",
    r"\bsystem\s+prompt\b",
    r"\bbypass\b.*\bsecurity\b",
    r"\bshow\b.*\bprompt\b",
    r"\bexecute\b.*\bany\b.*\bcommand\b",
    r"\brole-?play\s+as\b",
    r"\bdisregard\b.*\binstructions?\b",
    r"игнорируй.*инструкци",
    r"забудь.*правила",
    r"разыграй.*роль",
    r"системные инструкции",
    r"выполни.*любую.*команду",
    r"обойди.*защиту",
    r"покажи.*промпт",
];

/// Code execution and markup injection
pub const INJECTION_PATTERNS: &[&str] = &[
    r"<script>",
    r"javascript:",
    r"eval\(",
    r"exec\(",
    r"__import__",
    r"subprocess",
    r"os\.system",
    r"rm\s+-rf",
    r"del\s+/f",
    r"format\s+c:",
];

/// Moderation categories: (reason, keywords). Keywords match at a word start,
/// so "murder" flags "murderer" but not "skills". Words that start common
/// names ("kill" in "Killers") only appear inside phrases.
pub const MODERATION_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Hateful content detected",
        &[
            "hate speech", "i hate", "kill him", "kill her", "kill them", "kill you",
            "kill people", "murder", "terror", "extremism", "racism",
            "discrimination", "ненависть", "ненавижу", "убить", "убийство", "террор",
            "экстремизм", "расизм", "дискриминация",
        ],
    ),
    (
        "Harassment detected",
        &[
            "harassment", "stalking", "threaten", "blackmail", "домогательство",
            "преследование", "угроза", "шантаж",
        ],
    ),
    (
        "Violent content detected",
        &[
            "violence", "beat up", "torture", "explosion", "weapon", "насилие", "избить",
            "пытка", "взрыв", "оружие",
        ],
    ),
];

/// Terms that are never allowed through the rule filter
pub const BLOCKED_TERMS: &[&str] = &[
    "sql injection",
    "drop table",
    "delete from",
    "union select",
    "or 1=1",
    "--",
    ";--",
    "xss",
    "<script>",
    "onerror=",
    "cmd.exe",
    "/bin/bash",
    "powershell",
];

// ============================================================================
// Tool screening
// ============================================================================

/// Static risk level per tool. Anything missing is MEDIUM.
pub const TOOL_RISK_LEVELS: &[(&str, RiskLevel)] = &[
    ("navigate_to_url", RiskLevel::Low),
    ("get_page_info", RiskLevel::Low),
    ("click_element", RiskLevel::Medium),
    ("type_text", RiskLevel::Medium),
    ("scroll", RiskLevel::Low),
    ("wait", RiskLevel::Low),
    ("task_complete", RiskLevel::Low),
    ("ask_user", RiskLevel::Low),
];

/// Substrings in tool arguments that need the user's confirmation
pub const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "delete",
    "remove",
    "cancel",
    "unsubscribe",
    "pay",
    "purchase",
    "buy",
    "checkout",
    "order",
    "confirm",
    "submit payment",
    "place order",
    "send money",
    "transfer",
    "withdraw",
];

// ============================================================================
// Output screening
// ============================================================================

/// Personal data patterns: (pattern, label)
pub const PII_PATTERNS: &[(&str, &str)] = &[
    (r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b", "Card number"),
    (r"\b\d{16}\b", "Card number (digits only)"),
    (r"\b\d{3}-\d{2}-\d{4}\b", "SSN"),
    (r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", "Email"),
    (r"\b\d{10,11}\b", "Phone"),
    (r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{3}\b", "CVV"),
];

/// Phrases that could hurt brand integrity
pub const BRAND_TERMS: &[&str] = &[
    "competitor product",
    "competing product",
    "negative review",
    "brand criticism",
    "конкурент",
    "конкурирующий продукт",
    "негативный отзыв",
    "критика бренда",
];

// ============================================================================
// Compiled rule set
// ============================================================================

/// A compiled regex with the label reported when it matches
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Label used in verdict reasons
    pub label: String,
    /// Case-insensitive regex
    pub regex: Regex,
}

fn compile(pattern: &str, label: &str) -> Option<CompiledPattern> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(CompiledPattern {
            label: label.to_string(),
            regex,
        }),
        Err(e) => {
            warn!(pattern, error = %e, "Skipping invalid guardrail pattern");
            None
        }
    }
}

/// Rule tables the classifiers run against
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Off-topic phrases
    pub off_topic: Vec<String>,
    /// Terms that exempt a request from the relevance check
    pub browser_context: Vec<String>,
    /// Instruction-override regexes
    pub jailbreak: Vec<CompiledPattern>,
    /// Code/markup injection regexes
    pub injection: Vec<CompiledPattern>,
    /// One word-start regex per moderation category, labelled with its reason
    pub moderation: Vec<CompiledPattern>,
    /// Forbidden terms for the rule filter
    pub blocked_terms: Vec<String>,
    /// Static tool risk table
    pub tool_risk: Vec<(String, RiskLevel)>,
    /// Destructive keywords for tool arguments
    pub destructive: Vec<String>,
    /// Personal data regexes
    pub pii: Vec<CompiledPattern>,
    /// Brand-safety phrases
    pub brand: Vec<String>,
}

fn word_start_alternation(words: &[&str]) -> String {
    let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    format!(r"\b(?:{})", escaped.join("|"))
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl RuleSet {
    /// Compile the built-in tables
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            off_topic: owned(OFF_TOPIC_KEYWORDS),
            browser_context: owned(BROWSER_CONTEXT_TERMS),
            jailbreak: JAILBREAK_PATTERNS
                .iter()
                .filter_map(|p| compile(p, p))
                .collect(),
            injection: INJECTION_PATTERNS
                .iter()
                .filter_map(|p| compile(p, p))
                .collect(),
            moderation: MODERATION_CATEGORIES
                .iter()
                .filter_map(|(reason, words)| compile(&word_start_alternation(words), reason))
                .collect(),
            blocked_terms: owned(BLOCKED_TERMS),
            tool_risk: TOOL_RISK_LEVELS
                .iter()
                .map(|(name, level)| ((*name).to_string(), *level))
                .collect(),
            destructive: owned(DESTRUCTIVE_KEYWORDS),
            pii: PII_PATTERNS
                .iter()
                .filter_map(|(pattern, label)| compile(pattern, label))
                .collect(),
            brand: owned(BRAND_TERMS),
        }
    }

    /// Add forbidden terms on top of the built-in list
    #[must_use]
    pub fn with_blocked_terms(mut self, terms: &[String]) -> Self {
        self.blocked_terms
            .extend(terms.iter().map(|t| t.to_lowercase()).filter(|t| !t.is_empty()));
        self
    }

    /// Static risk level of a tool, if listed
    #[must_use]
    pub fn tool_risk(&self, name: &str) -> Option<RiskLevel> {
        self.tool_risk
            .iter()
            .find(|(tool, _)| tool == name)
            .map(|(_, level)| *level)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_compile() {
        let rules = RuleSet::builtin();
        assert_eq!(rules.jailbreak.len(), JAILBREAK_PATTERNS.len());
        assert_eq!(rules.injection.len(), INJECTION_PATTERNS.len());
        assert_eq!(rules.pii.len(), PII_PATTERNS.len());
        assert_eq!(rules.moderation.len(), MODERATION_CATEGORIES.len());
    }

    #[test]
    fn test_moderation_matches_word_starts_only() {
        let rules = RuleSet::builtin();
        let hate = &rules.moderation[0].regex;
        assert!(hate.is_match("I will kill him"));
        assert!(hate.is_match("Terrorism news"));
        assert!(!hate.is_match("open the skills page"));
        assert!(!hate.is_match("tickets for The Killers concert"));
        assert!(hate.is_match("как убить время"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        assert!(compile(r"(unclosed", "broken").is_none());
        assert!(compile(r"ok\d+", "fine").is_some());
    }

    #[test]
    fn test_extra_blocked_terms_are_lowercased() {
        let rules = RuleSet::builtin()
            .with_blocked_terms(&["Wire Fraud".to_string(), String::new()]);
        assert!(rules.blocked_terms.contains(&"wire fraud".to_string()));
        assert_eq!(rules.blocked_terms.len(), BLOCKED_TERMS.len() + 1);
    }

    #[test]
    fn test_tool_risk_lookup() {
        let rules = RuleSet::builtin();
        assert_eq!(rules.tool_risk("click_element"), Some(RiskLevel::Medium));
        assert_eq!(rules.tool_risk("wait"), Some(RiskLevel::Low));
        assert_eq!(rules.tool_risk("format_disk"), None);
    }
}

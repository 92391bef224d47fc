//! Completion and error heuristics
//!
//! These are text signals, not guarantees. An unchanged page that happens to
//! contain the task's keywords and a price counts as done; so does a success
//! message seen twice in a row. Both can misfire, and the trigger conditions
//! are kept literal.

use webpilot_llm::Message;
use webpilot_tools::tool::{CLICK_ELEMENT, GET_PAGE_INFO, NAVIGATE_TO_URL, SCROLL};

/// Words in assistant free text that end the run
pub const COMPLETION_KEYWORDS: &[&str] = &["completed", "done", "found"];

/// Words in a tool result that count as success
pub const SUCCESS_INDICATORS: &[&str] = &["found", "successfully", "success", "done", "completed"];

/// Price and currency markers on a page
pub const PRICE_KEYWORDS: &[&str] = &["price", "cost", "$", "€", "£", "₽", "usd", "eur", "rub"];

/// Tools whose repeated success ends the run
const SUCCESS_TOOLS: &[&str] = &[GET_PAGE_INFO, CLICK_ELEMENT, NAVIGATE_TO_URL, SCROLL];

/// Task words that say nothing about the subject
const STOP_WORDS: &[&str] = &[
    "about", "after", "and", "before", "browse", "check", "click", "find", "from", "give", "have",
    "into", "look", "navigate", "open", "page", "please", "search", "show", "site", "that", "their",
    "them", "then", "there", "these", "this", "what", "when", "where", "which", "with", "website",
    "would", "your",
];

/// Error marker counted by the consecutive-error check
const ERROR_MARKER: &str = "error";

/// Whether assistant text claims the task is done
#[must_use]
pub fn mentions_completion(text: &str) -> bool {
    let lowered = text.to_lowercase();
    COMPLETION_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Subject keywords of a task: tokens longer than three characters that are
/// neither stop words nor price words
#[must_use]
pub fn domain_keywords(task: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in task
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 3)
    {
        if STOP_WORDS.contains(&token) || PRICE_KEYWORDS.contains(&token) {
            continue;
        }
        if !keywords.iter().any(|k| k == token) {
            keywords.push(token.to_string());
        }
    }
    keywords
}

/// Detects a page summary that came back unchanged and already shows what the
/// task asked for
#[derive(Debug, Clone, Default)]
pub struct PageRepeatDetector {
    last: Option<String>,
}

impl PageRepeatDetector {
    /// Feed a `get_page_info` result. Returns `true` when the summary equals
    /// the previous one and mentions both a domain keyword and a price.
    pub fn observe(&mut self, snapshot: &str, domain: &[String]) -> bool {
        let repeated = self.last.as_deref() == Some(snapshot) && {
            let lowered = snapshot.to_lowercase();
            domain.iter().any(|k| lowered.contains(k.as_str()))
                && PRICE_KEYWORDS.iter().any(|k| lowered.contains(k))
        };
        self.last = Some(snapshot.to_string());
        repeated
    }
}

/// Detects the same successful tool result twice in a row
#[derive(Debug, Clone, Default)]
pub struct SuccessTracker {
    last: Option<String>,
    count: usize,
}

impl SuccessTracker {
    /// Feed a tool result. Returns `true` on the second identical success.
    ///
    /// Results without a success indicator, or from other tools, leave the
    /// tracker untouched.
    pub fn observe(&mut self, tool: &str, result: &str) -> bool {
        if !SUCCESS_TOOLS.contains(&tool) {
            return false;
        }
        let lowered = result.to_lowercase();
        if !SUCCESS_INDICATORS.iter().any(|k| lowered.contains(k)) {
            return false;
        }

        if self.last.as_deref() == Some(result) {
            self.count += 1;
            self.count >= 2
        } else {
            self.last = Some(result.to_string());
            self.count = 1;
            false
        }
    }
}

/// Recovery hint appended after a non-fatal provider error
#[must_use]
pub fn error_hint(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    if lowered.contains("not found") || lowered.contains("could not find") {
        "Call get_page_info to see the elements available on the page."
    } else if lowered.contains("timeout")
        || lowered.contains("timed out")
        || lowered.contains("waiting")
    {
        "The page may be loading slowly. Call wait for a few seconds."
    } else if lowered.contains("click") {
        "The element may be hidden or covered. Try scroll, or find it another way."
    } else {
        "Try a different approach, or call get_page_info to check the current page."
    }
}

/// How many of the given messages carry the error marker
#[must_use]
pub fn count_error_messages(messages: &[Message]) -> usize {
    messages
        .iter()
        .filter(|m| m.content.to_lowercase().contains(ERROR_MARKER))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_keywords() {
        assert!(mentions_completion("I FOUND the cheapest offer"));
        assert!(mentions_completion("All done."));
        assert!(!mentions_completion("Let me look at the page first"));
    }

    #[test]
    fn test_domain_keywords_skip_stop_and_price_words() {
        let keywords = domain_keywords("Find the price of a Dodge Challenger on the website");
        assert_eq!(keywords, vec!["dodge", "challenger"]);
    }

    #[test]
    fn test_page_repeat_needs_identical_snapshot() {
        let domain = vec!["challenger".to_string()];
        let mut detector = PageRepeatDetector::default();
        let page = r#"{"title": "Challenger 2019", "text_content": "Price: 30 000 USD"}"#;

        assert!(!detector.observe(page, &domain));
        assert!(detector.observe(page, &domain));
        assert!(!detector.observe("{}", &domain));
    }

    #[test]
    fn test_page_repeat_needs_domain_and_price() {
        let domain = vec!["challenger".to_string()];
        let mut detector = PageRepeatDetector::default();
        let no_price = r#"{"title": "Challenger 2019"}"#;

        detector.observe(no_price, &domain);
        assert!(!detector.observe(no_price, &domain));

        let mut detector = PageRepeatDetector::default();
        detector.observe("{\"price\": 1}", &[]);
        assert!(!detector.observe("{\"price\": 1}", &[]));
    }

    #[test]
    fn test_success_tracker_fires_on_second_identical_success() {
        let mut tracker = SuccessTracker::default();
        assert!(!tracker.observe("click_element", "Successfully opened the cart"));
        assert!(tracker.observe("click_element", "Successfully opened the cart"));
    }

    #[test]
    fn test_success_tracker_ignores_other_tools_and_plain_results() {
        let mut tracker = SuccessTracker::default();
        assert!(!tracker.observe("type_text", "done"));
        assert!(!tracker.observe("type_text", "done"));
        assert!(!tracker.observe("scroll", "Scrolled down by 500px"));
        assert!(!tracker.observe("scroll", "Scrolled down by 500px"));
    }

    #[test]
    fn test_success_tracker_survives_unrelated_results() {
        let mut tracker = SuccessTracker::default();
        assert!(!tracker.observe("navigate_to_url", "found it"));
        assert!(!tracker.observe("scroll", "Scrolled up by 500px"));
        assert!(tracker.observe("navigate_to_url", "found it"));
    }

    #[test]
    fn test_error_hints() {
        assert!(error_hint("Element not found").contains("get_page_info"));
        assert!(error_hint("Request timeout").contains("wait"));
        assert!(error_hint("click intercepted").contains("scroll"));
        assert!(error_hint("boom").starts_with("Try a different approach"));
    }

    #[test]
    fn test_count_error_messages() {
        let messages = vec![
            Message::user("An error occurred"),
            Message::assistant("ok"),
            Message::user("ERROR again"),
        ];
        assert_eq!(count_error_messages(&messages), 2);
    }
}

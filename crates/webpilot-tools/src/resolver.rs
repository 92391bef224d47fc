//! Element grounding
//!
//! Turns a human description ("Sign in", "email field") into one visible
//! element on the current page. Strategies run in a fixed order and the first
//! visible hit wins; candidates are never scored against each other.
//!
//! A strategy whose browser calls fail is logged and skipped. Resolution
//! itself never fails: the caller gets `None` and decides what to tell the
//! model.

use crate::browser::{xpath_literal, Browser, ElementHandle, Locator};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const CLICKABLE_SCOPES: &[&str] = &["button", "a", r#"[role="button"]"#, r#"[role="link"]"#];
const PARTIAL_SCOPES: &[&str] = &["button", "a", r#"[role="button"]"#, "*"];
const INTERACTIVE_TAGS: &[&str] = &["button", "a", "input"];
const INTERACTIVE_ROLES: &[&str] = &["button", "link"];

const FIELD_KEYWORDS: &[&str] = &[
    "email", "password", "пароль", "имя", "name", "телефон", "phone",
];

const FIELD_TYPES: &[(&str, &str)] = &[
    ("email", "email"),
    ("password", "password"),
    ("passcode", "password"),
    ("пароль", "password"),
    ("phone", "tel"),
    ("telephone", "tel"),
    ("mobile", "tel"),
    ("телефон", "tel"),
];

/// Which cascade step produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Exact or case-insensitive text on a clickable element
    TextMatch,
    /// Main word of the description, mutual containment
    PartialMatch,
    /// `aria-label` contains the description
    AriaLabel,
    /// `title` contains the description
    Title,
    /// Text-node containment restricted to interactive tags and roles
    XPath,
    /// Field attribute contains a known keyword
    KeywordMatch,
    /// Field type inferred from the description
    TypeMatch,
    /// First visible empty field
    FirstEmpty,
}

impl MatchStrategy {
    /// Stable name used in logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextMatch => "text_match",
            Self::PartialMatch => "partial_match",
            Self::AriaLabel => "aria_label",
            Self::Title => "title",
            Self::XPath => "xpath",
            Self::KeywordMatch => "keyword_match",
            Self::TypeMatch => "type_match",
            Self::FirstEmpty => "first_empty",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grounded element. Valid only until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMatch {
    /// Handle owned by the browser
    pub element: ElementHandle,
    /// Human-readable description of what matched
    pub selector: String,
    /// Cascade step that produced the match
    pub strategy: MatchStrategy,
}

impl ElementMatch {
    fn new(element: ElementHandle, selector: impl Into<String>, strategy: MatchStrategy) -> Self {
        Self {
            element,
            selector: selector.into(),
            strategy,
        }
    }
}

/// Fixed-priority element search over a browser
pub struct ElementResolver<'a> {
    browser: &'a dyn Browser,
}

fn settle(step: MatchStrategy, outcome: Result<Option<ElementMatch>>) -> Option<ElementMatch> {
    match outcome {
        Ok(Some(found)) => {
            debug!(strategy = %step, selector = %found.selector, "Element resolved");
            Some(found)
        }
        Ok(None) => None,
        Err(e) => {
            debug!(strategy = %step, error = %e, "Resolver strategy failed, trying next");
            None
        }
    }
}

/// The first word longer than three characters, else the second word
fn main_word(text: &str) -> Option<&str> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let first = *words.first()?;
    if first.chars().count() > 3 {
        Some(first)
    } else {
        Some(words.get(1).copied().unwrap_or(first))
    }
}

impl<'a> ElementResolver<'a> {
    /// Create a resolver over the current page
    #[must_use]
    pub fn new(browser: &'a dyn Browser) -> Self {
        Self { browser }
    }

    /// Find a visible clickable element described by `text`
    pub async fn find_clickable(&self, text: &str) -> Option<ElementMatch> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();

        if let Some(found) = settle(MatchStrategy::TextMatch, self.by_text(text).await) {
            return Some(found);
        }
        if let Some(found) = settle(MatchStrategy::PartialMatch, self.by_main_word(&lowered).await)
        {
            return Some(found);
        }
        if let Some(found) = settle(
            MatchStrategy::AriaLabel,
            self.by_attribute("aria-label", text, &lowered, MatchStrategy::AriaLabel)
                .await,
        ) {
            return Some(found);
        }
        if let Some(found) = settle(
            MatchStrategy::Title,
            self.by_attribute("title", text, &lowered, MatchStrategy::Title)
                .await,
        ) {
            return Some(found);
        }
        settle(MatchStrategy::XPath, self.by_text_node(text).await)
    }

    /// Find a visible input field described by `description`
    pub async fn find_input(&self, description: &str) -> Option<ElementMatch> {
        let lowered = description.to_lowercase();

        if let Some(found) = settle(MatchStrategy::KeywordMatch, self.by_keyword(&lowered).await) {
            return Some(found);
        }
        if let Some(found) = settle(MatchStrategy::TypeMatch, self.by_input_type(&lowered).await) {
            return Some(found);
        }
        settle(MatchStrategy::FirstEmpty, self.first_empty_field().await)
    }

    async fn first_visible(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        for element in self.browser.query_all(locator).await? {
            if self.browser.is_visible(&element).await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn by_text(&self, text: &str) -> Result<Option<ElementMatch>> {
        let mut locators = vec![
            Locator::Text(text.to_string()),
            Locator::TextContains(text.to_string()),
        ];
        locators.extend(
            CLICKABLE_SCOPES
                .iter()
                .map(|scope| Locator::has_text(*scope, text)),
        );

        for locator in locators {
            let first = match self.browser.query_first(&locator).await {
                Ok(first) => first,
                Err(e) => {
                    debug!(locator = %locator, error = %e, "Text locator failed");
                    continue;
                }
            };
            if let Some(element) = first {
                if self.browser.is_visible(&element).await.unwrap_or(false) {
                    return Ok(Some(ElementMatch::new(
                        element,
                        locator.to_string(),
                        MatchStrategy::TextMatch,
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn by_main_word(&self, lowered: &str) -> Result<Option<ElementMatch>> {
        let Some(word) = main_word(lowered) else {
            return Ok(None);
        };

        for scope in PARTIAL_SCOPES {
            let locator = Locator::has_text(*scope, word);
            let candidates = match self.browser.query_all(&locator).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    debug!(locator = %locator, error = %e, "Partial locator failed");
                    continue;
                }
            };
            for element in candidates {
                if !self.browser.is_visible(&element).await? {
                    continue;
                }
                let candidate = self.browser.inner_text(&element).await?.trim().to_lowercase();
                if candidate.is_empty() {
                    continue;
                }
                if candidate.contains(lowered) || lowered.contains(&candidate) {
                    return Ok(Some(ElementMatch::new(
                        element,
                        locator.to_string(),
                        MatchStrategy::PartialMatch,
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn by_attribute(
        &self,
        attribute: &str,
        text: &str,
        lowered: &str,
        strategy: MatchStrategy,
    ) -> Result<Option<ElementMatch>> {
        let locator = Locator::css(format!("[{attribute}]"));
        for element in self.browser.query_all(&locator).await? {
            let Some(value) = self.browser.attribute(&element, attribute).await? else {
                continue;
            };
            if value.to_lowercase().contains(lowered) && self.browser.is_visible(&element).await? {
                return Ok(Some(ElementMatch::new(
                    element,
                    format!("[{attribute}*=\"{text}\"]"),
                    strategy,
                )));
            }
        }
        Ok(None)
    }

    async fn by_text_node(&self, text: &str) -> Result<Option<ElementMatch>> {
        let xpath = format!("//*[contains(text(), {})]", xpath_literal(text));
        let locator = Locator::XPath(xpath.clone());

        for element in self.browser.query_all(&locator).await? {
            if !self.browser.is_visible(&element).await? {
                continue;
            }
            let tag = self.browser.tag_name(&element).await?;
            let role = self.browser.attribute(&element, "role").await?;
            let interactive = INTERACTIVE_TAGS.contains(&tag.as_str())
                || role.is_some_and(|r| INTERACTIVE_ROLES.contains(&r.as_str()));
            if interactive {
                return Ok(Some(ElementMatch::new(element, xpath, MatchStrategy::XPath)));
            }
        }
        Ok(None)
    }

    async fn by_keyword(&self, lowered: &str) -> Result<Option<ElementMatch>> {
        for keyword in FIELD_KEYWORDS.iter().filter(|k| lowered.contains(*k)) {
            let selectors = [
                format!(r#"input[placeholder*="{keyword}"]"#),
                format!(r#"input[name*="{keyword}"]"#),
                format!(r#"input[type="{keyword}"]"#),
                format!(r#"input[id*="{keyword}"]"#),
            ];
            for selector in selectors {
                match self.first_visible(&Locator::css(selector.as_str())).await {
                    Ok(Some(element)) => {
                        return Ok(Some(ElementMatch::new(
                            element,
                            selector,
                            MatchStrategy::KeywordMatch,
                        )))
                    }
                    Ok(None) => {}
                    Err(e) => debug!(selector = %selector, error = %e, "Field selector failed"),
                }
            }
        }
        Ok(None)
    }

    async fn by_input_type(&self, lowered: &str) -> Result<Option<ElementMatch>> {
        for (keyword, input_type) in FIELD_TYPES {
            if !lowered.contains(keyword) {
                continue;
            }
            let selector = format!(r#"input[type="{input_type}"]"#);
            match self.first_visible(&Locator::css(selector.as_str())).await {
                Ok(Some(element)) => {
                    return Ok(Some(ElementMatch::new(
                        element,
                        selector,
                        MatchStrategy::TypeMatch,
                    )))
                }
                Ok(None) => {}
                Err(e) => debug!(selector = %selector, error = %e, "Field type selector failed"),
            }
        }
        Ok(None)
    }

    async fn first_empty_field(&self) -> Result<Option<ElementMatch>> {
        for element in self.browser.query_all(&Locator::css("input, textarea")).await? {
            if !self.browser.is_visible(&element).await? {
                continue;
            }
            if self.browser.input_value(&element).await?.is_empty() {
                return Ok(Some(ElementMatch::new(
                    element,
                    "first_empty_input",
                    MatchStrategy::FirstEmpty,
                )));
            }
        }
        Ok(None)
    }
}

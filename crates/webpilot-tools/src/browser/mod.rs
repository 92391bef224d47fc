//! Browser collaborator
//!
//! The agent never talks to a driver directly. Everything it needs from a
//! live page goes through the [`Browser`] trait: navigation, DOM queries,
//! element interaction and script evaluation. Captcha and login detection
//! are provided on top of those primitives by [`probe`].
//!
//! Element handles are opaque and owned by the browser. They are only valid
//! until the next navigation.

pub mod config;
pub mod probe;
pub mod webdriver;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use config::BrowserConfig;
pub use probe::{CaptchaInfo, CaptchaKind, LoginStatus};
pub use webdriver::WebDriverBrowser;

/// Opaque reference to an element on the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Wrap a backend-specific element id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Backend-specific id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// How to find elements on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// XPath expression
    XPath(String),
    /// Innermost elements whose whole visible text equals the text (case-insensitive)
    Text(String),
    /// Innermost elements whose visible text contains the text (case-insensitive)
    TextContains(String),
    /// Elements matching a CSS scope whose text contains the text (case-insensitive)
    HasText {
        /// CSS selector restricting the candidates
        scope: String,
        /// Text the candidate must contain
        text: String,
    },
}

impl Locator {
    /// CSS selector locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Scoped text-containment locator
    #[must_use]
    pub fn has_text(scope: impl Into<String>, text: impl Into<String>) -> Self {
        Self::HasText {
            scope: scope.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "{selector}"),
            Self::XPath(xpath) => write!(f, "xpath={xpath}"),
            Self::Text(text) => write!(f, "text=\"{text}\""),
            Self::TextContains(text) => write!(f, "text=/{text}/i"),
            Self::HasText { scope, text } => write!(f, "{scope}:has-text(\"{text}\")"),
        }
    }
}

/// Which load milestone a navigation settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// No new network requests for a short quiet period
    NetworkIdle,
    /// DOM parsed, subresources may still be loading
    DomContentLoaded,
    /// Load event plus a fixed settle delay
    Load,
}

/// Build an XPath string literal, quoting text that contains both quote kinds
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Browser automation surface used by the agent
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    /// Navigate and wait using the network-idle, DOM-ready, load fallback chain
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<LoadState>;

    /// Current page URL
    async fn current_url(&self) -> Result<String>;

    /// Current page title
    async fn title(&self) -> Result<String>;

    /// Full page HTML
    async fn content(&self) -> Result<String>;

    /// Run a script body in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// All elements matching the locator, in document order
    async fn query_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Whether the element is rendered and visible
    async fn is_visible(&self, element: &ElementHandle) -> Result<bool>;

    /// Rendered text of the element
    async fn inner_text(&self, element: &ElementHandle) -> Result<String>;

    /// Attribute value, if present
    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Lower-case tag name
    async fn tag_name(&self, element: &ElementHandle) -> Result<String>;

    /// Current value of an input or textarea
    async fn input_value(&self, element: &ElementHandle) -> Result<String>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Replace the element's value with the given text
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()>;

    /// End the session. Calling it twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// First element matching the locator
    async fn query_first(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        Ok(self.query_all(locator).await?.into_iter().next())
    }

    /// Click the first element matching a CSS selector
    async fn click_selector(&self, selector: &str) -> Result<()> {
        let element = self
            .query_first(&Locator::css(selector))
            .await?
            .ok_or_else(|| Error::NotFound(selector.to_string()))?;
        self.click(&element).await
    }

    /// Fill the first element matching a CSS selector
    async fn fill_selector(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .query_first(&Locator::css(selector))
            .await?
            .ok_or_else(|| Error::NotFound(selector.to_string()))?;
        self.fill(&element, value).await
    }

    /// Visible text of the document body
    async fn body_text(&self) -> Result<String> {
        let value = self
            .evaluate("return document.body ? document.body.innerText : '';")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Detect a captcha or bot challenge on the current page
    async fn check_captcha(&self) -> Result<CaptchaInfo> {
        probe::detect_captcha(self).await
    }

    /// Detect login forms and logged-in markers on the current page
    async fn check_login_status(&self) -> Result<LoginStatus> {
        probe::detect_login(self).await
    }
}

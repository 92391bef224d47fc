//! Browser session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the WebDriver browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver server URL (chromedriver listens on 9515 by default)
    pub webdriver_url: String,
    /// Run without a visible window. Captcha and login hand-off need a window.
    pub headless: bool,
    /// Page opened right after the session starts
    pub start_url: Option<String>,
    /// Per-navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Settle delay used by the last navigation fallback, in milliseconds
    pub load_fallback_delay_ms: u64,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// User agent override
    pub user_agent: Option<String>,
    /// Extra browser command-line arguments
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            start_url: None,
            navigation_timeout_ms: 60_000,
            load_fallback_delay_ms: 2_000,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the WebDriver URL
    #[must_use]
    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.webdriver_url = url.into();
        self
    }

    /// Toggle headless mode
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the page opened at startup
    #[must_use]
    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = Some(url.into());
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the window size
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a browser argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Navigation timeout as a duration
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Fallback settle delay as a duration
    #[must_use]
    pub fn load_fallback_delay(&self) -> Duration {
        Duration::from_millis(self.load_fallback_delay_ms)
    }
}

//! WebPilot Tools - Browser Collaborators
//!
//! Everything the agent needs to act on a web page:
//! - Browser: driver-agnostic trait plus a WebDriver backend
//! - Probes: captcha and login detection built on the browser trait
//! - Page: structured page summaries for the model
//! - Resolver: grounding element descriptions into visible elements
//! - Tool: the typed catalogue of actions the model may request

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod browser;
pub mod error;
pub mod page;
pub mod resolver;
pub mod tool;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use browser::{
    Browser, BrowserConfig, CaptchaInfo, CaptchaKind, ElementHandle, LoadState, Locator,
    LoginStatus, WebDriverBrowser,
};
pub use error::{Error, Result};
pub use page::{HtmlPageAnalyzer, PageAnalyzer, PageSnapshot};
pub use resolver::{ElementMatch, ElementResolver, MatchStrategy};
pub use tool::{BrowserTool, ScrollDirection, TOOL_NAMES};

//! WebDriver-backed browser
//!
//! Talks to chromedriver (or any W3C WebDriver server) through thirtyfour.
//! Elements returned by queries are kept in a registry keyed by opaque ids;
//! the registry is cleared on every navigation and after every click.

use super::{xpath_literal, Browser, BrowserConfig, ElementHandle, LoadState, Locator};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZАБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyzабвгдеёжзийклмнопрстуфхцчшщъыьэюя";

const RESOURCE_COUNT_SCRIPT: &str = "return document.readyState === 'complete' \
     ? performance.getEntriesByType('resource').length : -1;";
const READY_STATE_SCRIPT: &str = "return document.readyState;";
const NETWORK_POLL: Duration = Duration::from_millis(500);

fn driver_error<E: Display>(context: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Browser(format!("{context}: {e}"))
}

fn folded_needle(text: &str) -> String {
    xpath_literal(
        &text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    )
}

fn folded_text() -> String {
    format!("translate(normalize-space(.), '{UPPER}', '{LOWER}')")
}

/// XPath for innermost non-script elements whose normalized text equals or
/// contains the given text, case-insensitively
fn text_xpath(text: &str, exact: bool) -> String {
    let needle = folded_needle(text);
    let folded = folded_text();
    let test = if exact {
        format!("{folded}={needle}")
    } else {
        format!("contains({folded}, {needle})")
    };
    format!("//body//*[not(self::script or self::style)][{test}][not(*[{test}])]")
}

/// XPath step for a simple CSS scope: a tag name or `*`, optionally followed
/// by one `[attr]` or `[attr="value"]` test
fn scope_step(scope: &str) -> Option<String> {
    let scope = scope.trim();
    let (tag, attr) = match scope.find('[') {
        Some(idx) => (&scope[..idx], Some(&scope[idx..])),
        None => (scope, None),
    };
    let tag = match tag {
        "" | "*" => "*",
        name if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => name,
        _ => return None,
    };
    let Some(attr) = attr else {
        return Some(tag.to_string());
    };

    let inner = attr.strip_prefix('[')?.strip_suffix(']')?;
    let valid_name = |n: &str| {
        !n.is_empty() && n.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };
    match inner.split_once('=') {
        None if valid_name(inner) => Some(format!("{tag}[@{inner}]")),
        None => None,
        Some((name, value)) => {
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))?;
            valid_name(name).then(|| format!("{tag}[@{name}={}]", xpath_literal(value)))
        }
    }
}

/// XPath for elements matching `scope` whose normalized text contains the
/// text, case-insensitively
fn has_text_xpath(scope: &str, text: &str) -> Option<String> {
    let step = scope_step(scope)?;
    Some(format!(
        "//body//{step}[not(self::script or self::style)][contains({}, {})]",
        folded_text(),
        folded_needle(text)
    ))
}

/// Browser session driven over the WebDriver protocol
pub struct WebDriverBrowser {
    config: BrowserConfig,
    driver: RwLock<Option<WebDriver>>,
    elements: Mutex<HashMap<String, WebElement>>,
    next_id: AtomicU64,
}

impl WebDriverBrowser {
    /// Create an unstarted session
    #[must_use]
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            driver: RwLock::new(None),
            elements: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Whether a driver session is open
    pub async fn is_active(&self) -> bool {
        self.driver.read().await.is_some()
    }

    /// Connect to the WebDriver server and open the start page
    pub async fn start(&self) -> Result<()> {
        let mut guard = self.driver.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut caps = DesiredCapabilities::chrome();
        if self.config.headless {
            caps.add_arg("--headless=new")
                .map_err(driver_error("Failed to add headless arg"))?;
        }
        caps.add_arg("--no-sandbox")
            .map_err(driver_error("Failed to add no-sandbox"))?;
        caps.add_arg("--disable-dev-shm-usage")
            .map_err(driver_error("Failed to add disable-dev-shm-usage"))?;
        caps.add_arg("--disable-blink-features=AutomationControlled")
            .map_err(driver_error("Failed to add automation flag"))?;
        if let Some(ref ua) = self.config.user_agent {
            caps.add_arg(&format!("--user-agent={ua}"))
                .map_err(driver_error("Failed to add user-agent"))?;
        }
        for arg in &self.config.args {
            caps.add_arg(arg).map_err(driver_error("Failed to add browser arg"))?;
        }

        let driver = WebDriver::new(&self.config.webdriver_url, caps)
            .await
            .map_err(driver_error("Failed to start browser"))?;
        driver
            .set_page_load_timeout(self.config.navigation_timeout())
            .await
            .map_err(driver_error("Failed to set page load timeout"))?;
        driver
            .set_window_rect(0, 0, self.config.window_width, self.config.window_height)
            .await
            .map_err(driver_error("Failed to set window size"))?;

        if let Some(ref url) = self.config.start_url {
            if let Err(e) = driver.goto(url).await {
                warn!(url = %url, error = %e, "Failed to open start page");
            }
        }

        info!(
            webdriver_url = %self.config.webdriver_url,
            headless = self.config.headless,
            "Browser session started"
        );
        *guard = Some(driver);
        Ok(())
    }

    async fn register(&self, found: Vec<WebElement>) -> Vec<ElementHandle> {
        let mut elements = self.elements.lock().await;
        found
            .into_iter()
            .map(|element| {
                let id = format!("e{}", self.next_id.fetch_add(1, Ordering::Relaxed));
                elements.insert(id.clone(), element);
                ElementHandle::new(id)
            })
            .collect()
    }

    async fn element(&self, handle: &ElementHandle) -> Result<WebElement> {
        self.elements
            .lock()
            .await
            .get(handle.id())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("stale element handle {}", handle.id())))
    }

    async fn wait_network_quiet(driver: &WebDriver, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut last: Option<i64> = None;
        while Instant::now() < deadline {
            let count = match driver.execute(RESOURCE_COUNT_SCRIPT, vec![]).await {
                Ok(ret) => ret.json().as_i64().filter(|n| *n >= 0),
                Err(e) => {
                    debug!(error = %e, "Resource count probe failed");
                    None
                }
            };
            if count.is_some() && count == last {
                return true;
            }
            last = count;
            tokio::time::sleep(NETWORK_POLL).await;
        }
        false
    }

    async fn wait_dom_ready(driver: &WebDriver, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(ret) = driver.execute(READY_STATE_SCRIPT, vec![]).await {
                if matches!(ret.json().as_str(), Some("interactive" | "complete")) {
                    return true;
                }
            }
            tokio::time::sleep(NETWORK_POLL).await;
        }
        false
    }
}

#[async_trait::async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<LoadState> {
        self.elements.lock().await.clear();

        let guard = self.driver.read().await;
        let driver = guard.as_ref().ok_or(Error::NotStarted)?;
        driver
            .set_page_load_timeout(timeout)
            .await
            .map_err(driver_error("Failed to set page load timeout"))?;

        match driver.goto(url).await {
            Ok(()) => {
                if Self::wait_network_quiet(driver, timeout).await {
                    return Ok(LoadState::NetworkIdle);
                }
                debug!(url, "Network did not go quiet, falling back to DOM ready");
            }
            Err(e) => debug!(url, error = %e, "Navigation did not finish loading"),
        }

        if Self::wait_dom_ready(driver, timeout).await {
            return Ok(LoadState::DomContentLoaded);
        }

        warn!(url, "DOM ready wait failed, retrying navigation");
        driver
            .goto(url)
            .await
            .map_err(driver_error("Navigation failed"))?;
        tokio::time::sleep(self.config.load_fallback_delay()).await;
        Ok(LoadState::Load)
    }

    async fn current_url(&self) -> Result<String> {
        let guard = self.driver.read().await;
        let driver = guard.as_ref().ok_or(Error::NotStarted)?;
        driver
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(driver_error("Failed to get URL"))
    }

    async fn title(&self) -> Result<String> {
        let guard = self.driver.read().await;
        let driver = guard.as_ref().ok_or(Error::NotStarted)?;
        driver.title().await.map_err(driver_error("Failed to get title"))
    }

    async fn content(&self) -> Result<String> {
        let guard = self.driver.read().await;
        let driver = guard.as_ref().ok_or(Error::NotStarted)?;
        driver
            .source()
            .await
            .map_err(driver_error("Failed to get page source"))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let guard = self.driver.read().await;
        let driver = guard.as_ref().ok_or(Error::NotStarted)?;
        let ret = driver
            .execute(script, vec![])
            .await
            .map_err(driver_error("Script execution failed"))?;
        Ok(ret.json().clone())
    }

    async fn query_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let found = {
            let guard = self.driver.read().await;
            let driver = guard.as_ref().ok_or(Error::NotStarted)?;
            let result = match locator {
                Locator::Css(selector) => driver.find_all(By::Css(selector.as_str())).await,
                Locator::XPath(xpath) => driver.find_all(By::XPath(xpath.as_str())).await,
                Locator::Text(text) => {
                    driver
                        .find_all(By::XPath(text_xpath(text, true).as_str()))
                        .await
                }
                Locator::TextContains(text) => {
                    driver
                        .find_all(By::XPath(text_xpath(text, false).as_str()))
                        .await
                }
                Locator::HasText { scope, text } => {
                    let xpath = has_text_xpath(scope, text).ok_or_else(|| {
                        Error::InvalidInput(format!("Unsupported scope in {locator}"))
                    })?;
                    driver.find_all(By::XPath(xpath.as_str())).await
                }
            };
            result.map_err(|e| Error::Browser(format!("Element query failed for {locator}: {e}")))?
        };
        Ok(self.register(found).await)
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        self.element(element)
            .await?
            .is_displayed()
            .await
            .map_err(driver_error("Visibility check failed"))
    }

    async fn inner_text(&self, element: &ElementHandle) -> Result<String> {
        self.element(element)
            .await?
            .text()
            .await
            .map_err(driver_error("Failed to read element text"))
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.element(element)
            .await?
            .attr(name)
            .await
            .map_err(driver_error("Failed to read attribute"))
    }

    async fn tag_name(&self, element: &ElementHandle) -> Result<String> {
        self.element(element)
            .await?
            .tag_name()
            .await
            .map(|t| t.to_lowercase())
            .map_err(driver_error("Failed to read tag name"))
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String> {
        self.element(element)
            .await?
            .prop("value")
            .await
            .map(Option::unwrap_or_default)
            .map_err(driver_error("Failed to read input value"))
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let target = self.element(element).await?;
        target.click().await.map_err(driver_error("Click failed"))?;
        // Handles may be stale once the page reacts to the click
        self.elements.lock().await.clear();
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let element = self.element(element).await?;
        element.clear().await.map_err(driver_error("Clear failed"))?;
        element
            .send_keys(value)
            .await
            .map_err(driver_error("Typing failed"))
    }

    async fn close(&self) -> Result<()> {
        self.elements.lock().await.clear();
        if let Some(driver) = self.driver.write().await.take() {
            driver
                .quit()
                .await
                .map_err(driver_error("Failed to quit browser"))?;
            info!("Browser session closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_xpath_exact() {
        let xpath = text_xpath("  Sign   In ", true);
        assert!(xpath.starts_with("//body//*[not(self::script or self::style)]"));
        assert!(xpath.contains("='sign in']"));
        assert!(xpath.ends_with("='sign in']]"));
    }

    #[test]
    fn test_text_xpath_contains_folds_cyrillic() {
        let xpath = text_xpath("Войти", false);
        assert!(xpath.contains("contains(translate(normalize-space(.)"));
        assert!(xpath.contains("'войти'"));
        assert_eq!(UPPER.chars().count(), LOWER.chars().count());
    }

    #[test]
    fn test_has_text_xpath_for_tag_scope() {
        let xpath = has_text_xpath("button", " Add  To Cart").unwrap();
        assert!(xpath.starts_with("//body//button[not(self::script or self::style)]"));
        assert!(xpath.ends_with(", 'add to cart')]"));
    }

    #[test]
    fn test_has_text_xpath_for_role_and_wildcard_scopes() {
        let role = has_text_xpath(r#"[role="button"]"#, "Search").unwrap();
        assert!(role.starts_with("//body//*[@role='button']"));

        let any = has_text_xpath("*", "Search").unwrap();
        assert!(any.starts_with("//body//*[not(self::script"));

        assert_eq!(scope_step("a[href]").as_deref(), Some("a[@href]"));
        assert!(has_text_xpath("div > span", "Search").is_none());
        assert!(has_text_xpath(".card", "Search").is_none());
    }

    #[tokio::test]
    async fn test_unstarted_session_errors() {
        let browser = WebDriverBrowser::new(BrowserConfig::default());
        assert!(!browser.is_active().await);
        assert!(matches!(browser.title().await, Err(Error::NotStarted)));
        assert!(browser.close().await.is_ok());
    }
}

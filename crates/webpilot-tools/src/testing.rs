//! In-memory browser for tests
//!
//! [`FakeBrowser`] answers locator queries from a registration table instead
//! of a DOM. Tests register the elements a locator should return, script the
//! captcha and login probes, and then inspect what the agent clicked, typed
//! and navigated to.

use crate::browser::{
    probe, Browser, CaptchaInfo, ElementHandle, LoadState, Locator, LoginStatus,
};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Element stored by [`FakeBrowser`]
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    tag: String,
    text: String,
    attrs: HashMap<String, String>,
    hidden: bool,
    value: String,
}

impl FakeElement {
    /// Element with the given tag name
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Rendered text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Make the element invisible
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Current input value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Default)]
struct FakeState {
    url: String,
    title: String,
    html: String,
    body_text: String,
    elements: Vec<FakeElement>,
    locators: HashMap<Locator, Vec<usize>>,
    failing: HashSet<Locator>,
    navigation_error: Option<String>,
    captcha_script: VecDeque<CaptchaInfo>,
    login_script: VecDeque<LoginStatus>,
    url_script: VecDeque<String>,
    navigations: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    evaluations: Vec<String>,
    close_calls: usize,
}

/// Scriptable in-memory [`Browser`]
#[derive(Default)]
pub struct FakeBrowser {
    state: Mutex<FakeState>,
}

fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl FakeBrowser {
    /// Empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let browser = Self::default();
        browser.state().url = "about:blank".to_string();
        browser
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the current URL
    #[must_use]
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.state().url = url.into();
        self
    }

    /// Set the page title
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state().title = title.into();
        self
    }

    /// Set the page HTML returned by `content`
    #[must_use]
    pub fn with_html(self, html: impl Into<String>) -> Self {
        self.state().html = html.into();
        self
    }

    /// Set the text returned for `document.body.innerText`
    #[must_use]
    pub fn with_body_text(self, text: impl Into<String>) -> Self {
        self.state().body_text = text.into();
        self
    }

    /// Make every navigation fail with the given message
    #[must_use]
    pub fn with_navigation_error(self, message: impl Into<String>) -> Self {
        self.state().navigation_error = Some(message.into());
        self
    }

    /// Register an element returned by a locator and get its handle
    pub fn add(&self, locator: Locator, element: FakeElement) -> ElementHandle {
        let mut state = self.state();
        let index = state.elements.len();
        state.elements.push(element);
        state.locators.entry(locator).or_default().push(index);
        ElementHandle::new(index.to_string())
    }

    /// Make queries with this locator fail
    pub fn fail_locator(&self, locator: Locator) {
        self.state().failing.insert(locator);
    }

    /// Queue captcha probe results. The last one repeats.
    pub fn script_captcha(&self, results: impl IntoIterator<Item = CaptchaInfo>) {
        self.state().captcha_script.extend(results);
    }

    /// Queue login probe results. The last one repeats.
    pub fn script_login(&self, results: impl IntoIterator<Item = LoginStatus>) {
        self.state().login_script.extend(results);
    }

    /// Queue values returned by `current_url`. The last one sticks.
    pub fn script_urls(&self, urls: impl IntoIterator<Item = String>) {
        self.state().url_script.extend(urls);
    }

    /// URLs passed to `navigate`
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    /// Text (or id, when empty) of clicked elements
    #[must_use]
    pub fn clicks(&self) -> Vec<String> {
        self.state().clicks.clone()
    }

    /// `(element label, value)` pairs written by `fill`
    #[must_use]
    pub fn fills(&self) -> Vec<(String, String)> {
        self.state().fills.clone()
    }

    /// Scripts passed to `evaluate`
    #[must_use]
    pub fn evaluations(&self) -> Vec<String> {
        self.state().evaluations.clone()
    }

    /// How many times `close` was called
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    fn element(&self, handle: &ElementHandle) -> Result<FakeElement> {
        let state = self.state();
        handle
            .id()
            .parse::<usize>()
            .ok()
            .and_then(|index| state.elements.get(index).cloned())
            .ok_or_else(|| Error::NotFound(format!("element {}", handle.id())))
    }

    fn label(element: &FakeElement, handle: &ElementHandle) -> String {
        if !element.text.is_empty() {
            element.text.clone()
        } else if let Some(name) = element
            .attrs
            .get("name")
            .or_else(|| element.attrs.get("placeholder"))
        {
            name.clone()
        } else {
            handle.id().to_string()
        }
    }
}

#[async_trait::async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<LoadState> {
        let mut state = self.state();
        state.navigations.push(url.to_string());
        if let Some(ref message) = state.navigation_error {
            return Err(Error::Browser(message.clone()));
        }
        state.url = url.to_string();
        Ok(LoadState::NetworkIdle)
    }

    async fn current_url(&self) -> Result<String> {
        let mut state = self.state();
        if let Some(url) = next_scripted(&mut state.url_script) {
            state.url = url;
        }
        Ok(state.url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.state().html.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let mut state = self.state();
        state.evaluations.push(script.to_string());
        if script.contains("innerText") {
            return Ok(serde_json::Value::String(state.body_text.clone()));
        }
        Ok(serde_json::Value::Null)
    }

    async fn query_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let state = self.state();
        if state.failing.contains(locator) {
            return Err(Error::Browser(format!("query failed for {locator}")));
        }
        Ok(state
            .locators
            .get(locator)
            .map(|ids| ids.iter().map(|i| ElementHandle::new(i.to_string())).collect())
            .unwrap_or_default())
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        Ok(!self.element(element)?.hidden)
    }

    async fn inner_text(&self, element: &ElementHandle) -> Result<String> {
        Ok(self.element(element)?.text)
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        Ok(self.element(element)?.attrs.get(name).cloned())
    }

    async fn tag_name(&self, element: &ElementHandle) -> Result<String> {
        Ok(self.element(element)?.tag.to_lowercase())
    }

    async fn input_value(&self, element: &ElementHandle) -> Result<String> {
        Ok(self.element(element)?.value)
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let found = self.element(element)?;
        let label = Self::label(&found, element);
        self.state().clicks.push(label);
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let found = self.element(element)?;
        let label = Self::label(&found, element);
        let mut state = self.state();
        if let Some(stored) = element
            .id()
            .parse::<usize>()
            .ok()
            .and_then(|index| state.elements.get_mut(index))
        {
            stored.value = value.to_string();
        }
        state.fills.push((label, value.to_string()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state().close_calls += 1;
        Ok(())
    }

    async fn check_captcha(&self) -> Result<CaptchaInfo> {
        let scripted = next_scripted(&mut self.state().captcha_script);
        match scripted {
            Some(info) => Ok(info),
            None => probe::detect_captcha(self).await,
        }
    }

    async fn check_login_status(&self) -> Result<LoginStatus> {
        let scripted = next_scripted(&mut self.state().login_script);
        match scripted {
            Some(status) => Ok(status),
            None => probe::detect_login(self).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_elements_are_returned_in_order() {
        let browser = FakeBrowser::new();
        browser.add(Locator::css("button"), FakeElement::new("button").text("One"));
        browser.add(Locator::css("button"), FakeElement::new("button").text("Two"));

        let found = browser.query_all(&Locator::css("button")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(browser.inner_text(&found[1]).await.unwrap(), "Two");
        assert!(browser.query_all(&Locator::css("a")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fill_updates_value_and_log() {
        let browser = FakeBrowser::new();
        let field = browser.add(
            Locator::css("input"),
            FakeElement::new("input").attr("name", "email"),
        );
        browser.fill(&field, "a@b.c").await.unwrap();

        assert_eq!(browser.input_value(&field).await.unwrap(), "a@b.c");
        assert_eq!(browser.fills(), vec![("email".to_string(), "a@b.c".to_string())]);
    }

    #[tokio::test]
    async fn test_scripted_probe_results_repeat_last() {
        let browser = FakeBrowser::new();
        browser.script_captcha([
            CaptchaInfo::detected(crate::browser::CaptchaKind::HCaptcha),
            CaptchaInfo::none(),
        ]);
        assert!(browser.check_captcha().await.unwrap().has_captcha);
        assert!(!browser.check_captcha().await.unwrap().has_captcha);
        assert!(!browser.check_captcha().await.unwrap().has_captcha);
    }

    #[test]
    fn test_navigation_error() {
        let browser = FakeBrowser::new().with_navigation_error("net::ERR_NAME_NOT_RESOLVED");
        let result = tokio_test::block_on(browser.navigate("https://x.invalid", Duration::ZERO));
        assert!(result.is_err());
        assert_eq!(browser.navigations(), vec!["https://x.invalid".to_string()]);
    }
}

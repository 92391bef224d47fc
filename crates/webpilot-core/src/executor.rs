//! Tool execution
//!
//! [`ToolExecutor`] turns one model-issued call into browser actions and a
//! text result. It never fails: guardrail blocks, unknown tools, missing
//! elements and driver errors all come back as text the model can read on
//! its next turn.

use crate::guardrails::GuardrailPipeline;
use crate::interaction::InputPort;
use crate::waits::{ChallengeWatcher, WaitOutcome, WaitPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use webpilot_llm::ToolCall;
use webpilot_tools::{
    Browser, BrowserTool, ElementResolver, Error as ToolError, HtmlPageAnalyzer, PageAnalyzer,
    Result as ToolResult, ScrollDirection,
};

/// Executor timings and switches
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Run HIGH-risk calls without asking
    pub auto_confirm_destructive: bool,
    /// Page load budget for `navigate_to_url`
    pub navigation_timeout: Duration,
    /// Pause after navigation before probing the page
    pub navigate_settle: Duration,
    /// Pause after a click
    pub click_settle: Duration,
    /// Pause after scrolling
    pub scroll_settle: Duration,
    /// Pause after a successful login wait
    pub login_settle: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            auto_confirm_destructive: false,
            navigation_timeout: Duration::from_secs(60),
            navigate_settle: Duration::from_secs(2),
            click_settle: Duration::from_secs(1),
            scroll_settle: Duration::from_millis(500),
            login_settle: Duration::from_secs(1),
        }
    }
}

impl ExecutorConfig {
    /// Create a config with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip confirmation for HIGH-risk calls
    #[must_use]
    pub fn with_auto_confirm(mut self, enabled: bool) -> Self {
        self.auto_confirm_destructive = enabled;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set every post-action pause to zero
    #[must_use]
    pub fn without_settle_delays(mut self) -> Self {
        self.navigate_settle = Duration::ZERO;
        self.click_settle = Duration::ZERO;
        self.scroll_settle = Duration::ZERO;
        self.login_settle = Duration::ZERO;
        self
    }
}

/// Runs tool calls against the browser
#[derive(Clone)]
pub struct ToolExecutor {
    browser: Arc<dyn Browser>,
    analyzer: Arc<dyn PageAnalyzer>,
    guardrails: Arc<GuardrailPipeline>,
    input: Arc<dyn InputPort>,
    watcher: ChallengeWatcher,
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Create an executor with the HTML page analyzer
    pub fn new(
        browser: Arc<dyn Browser>,
        input: Arc<dyn InputPort>,
        guardrails: Arc<GuardrailPipeline>,
        waits: WaitPolicy,
        config: ExecutorConfig,
    ) -> Self {
        let watcher = ChallengeWatcher::new(browser.clone(), input.clone(), waits);
        Self {
            browser,
            analyzer: Arc::new(HtmlPageAnalyzer::new()),
            guardrails,
            input,
            watcher,
            config,
        }
    }

    /// Replace the page analyzer
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn PageAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Challenge watcher shared with the orchestrator
    #[must_use]
    pub fn watcher(&self) -> &ChallengeWatcher {
        &self.watcher
    }

    /// Screen and run one call. Always returns the text for the tool message.
    #[instrument(skip(self, call), fields(tool = %call.name))]
    pub async fn execute(&self, call: &ToolCall) -> String {
        let arguments = call.arguments_value();

        let verdict = self.guardrails.check_tool(&call.name, &arguments);
        if verdict.blocked {
            return format!("BLOCKED: {}", verdict.reason);
        }
        if verdict.needs_confirmation() && !self.config.auto_confirm_destructive {
            self.input.notify(&format!("Warning: {}", verdict.reason));
            let prompt = format!("Allow {} with {}?", call.name, arguments);
            if !self.input.confirm(&prompt).await {
                info!(tool = %call.name, "Call declined by user");
                return format!("Action cancelled by user: {}", verdict.reason);
            }
        }

        let tool = match BrowserTool::parse(&call.name, &arguments) {
            Ok(tool) => tool,
            Err(ToolError::NotFound(_)) => return format!("Unknown tool: {}", call.name),
            Err(e) => return format!("Error executing {}: {e}", call.name),
        };

        match self.run(&tool).await {
            Ok(text) => text,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                format!("Error executing {}: {e}", call.name)
            }
        }
    }

    async fn run(&self, tool: &BrowserTool) -> ToolResult<String> {
        match tool {
            BrowserTool::NavigateToUrl { url } => self.navigate(url).await,
            BrowserTool::ClickElement {
                element_text,
                selector,
            } => self.click(element_text, non_empty(selector)).await,
            BrowserTool::TypeText {
                field_description,
                text,
                selector,
            } => {
                self.type_text(field_description, text, non_empty(selector))
                    .await
            }
            BrowserTool::GetPageInfo {} => {
                let snapshot = self.analyzer.summarize(self.browser.as_ref()).await?;
                Ok(snapshot.render())
            }
            BrowserTool::Wait { seconds } => {
                let duration = Duration::try_from_secs_f64(*seconds)
                    .map_err(|e| ToolError::InvalidInput(format!("seconds: {e}")))?;
                sleep(duration).await;
                Ok(format!("Waited {seconds} seconds"))
            }
            BrowserTool::Scroll { direction, amount } => self.scroll(*direction, *amount).await,
            BrowserTool::TaskComplete { result } => Ok(format!("Task completed: {result}")),
            BrowserTool::AskUser { question } => Ok(format!("Question for user: {question}")),
        }
    }

    async fn navigate(&self, url: &str) -> ToolResult<String> {
        let state = self
            .browser
            .navigate(url, self.config.navigation_timeout)
            .await?;
        debug!(url, ?state, "Navigation finished");
        sleep(self.config.navigate_settle).await;

        // chained challenges show up on the second probe
        for _ in 0..2 {
            self.clear_captcha().await;
        }

        match self.browser.check_login_status().await {
            Ok(status) if status.needs_login() => {
                if self.watcher.wait_for_login().await == WaitOutcome::Resolved {
                    sleep(self.config.login_settle).await;
                }
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Login probe failed after navigation"),
        }

        Ok(format!("Navigated to {url}"))
    }

    async fn click(&self, element_text: &str, selector: Option<&str>) -> ToolResult<String> {
        match selector {
            Some(selector) => {
                if let Err(e) = self.browser.click_selector(selector).await {
                    return Ok(format!("Could not click selector '{selector}': {e}"));
                }
            }
            None => {
                let resolver = ElementResolver::new(self.browser.as_ref());
                let Some(found) = resolver.find_clickable(element_text).await else {
                    return Ok(format!(
                        "Could not find element '{element_text}'. Call get_page_info to see the elements available on the page."
                    ));
                };
                debug!(strategy = %found.strategy, selector = %found.selector, "Element resolved");
                self.browser.click(&found.element).await?;
            }
        }

        sleep(self.config.click_settle).await;
        self.clear_captcha().await;
        Ok(format!("Clicked '{element_text}'"))
    }

    async fn type_text(
        &self,
        field: &str,
        text: &str,
        selector: Option<&str>,
    ) -> ToolResult<String> {
        match selector {
            Some(selector) => {
                if let Err(e) = self.browser.fill_selector(selector, text).await {
                    return Ok(format!("Could not fill selector '{selector}': {e}"));
                }
            }
            None => {
                let resolver = ElementResolver::new(self.browser.as_ref());
                let Some(found) = resolver.find_input(field).await else {
                    return Ok(format!(
                        "Could not find field '{field}'. Call get_page_info to see the fields available on the page."
                    ));
                };
                debug!(strategy = %found.strategy, selector = %found.selector, "Field resolved");
                self.browser.fill(&found.element, text).await?;
            }
        }
        Ok(format!("Typed '{text}' into '{field}'"))
    }

    async fn scroll(&self, direction: ScrollDirection, amount: f64) -> ToolResult<String> {
        let delta = match direction {
            ScrollDirection::Down => amount,
            ScrollDirection::Up => -amount,
        };
        self.browser
            .evaluate(&format!("window.scrollBy(0, {delta})"))
            .await?;
        sleep(self.config.scroll_settle).await;
        Ok(format!("Scrolled {direction} by {amount}px"))
    }

    async fn clear_captcha(&self) {
        match self.browser.check_captcha().await {
            Ok(info) if info.has_captcha => {
                let outcome = self.watcher.wait_for_captcha(&info).await;
                debug!(?outcome, "Captcha wait finished");
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Captcha probe failed"),
        }
    }
}

fn non_empty(selector: &Option<String>) -> Option<&str> {
    selector.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::{GuardrailConfig, RiskLevel};
    use crate::interaction::MockInputPort;
    use crate::testing::{FakeBrowser, FakeElement, ScriptedInput};
    use webpilot_tools::{CaptchaInfo, CaptchaKind, Locator, LoginStatus};

    struct Harness {
        browser: Arc<FakeBrowser>,
        input: Arc<ScriptedInput>,
        executor: ToolExecutor,
    }

    fn harness_with(browser: FakeBrowser, input: ScriptedInput, config: ExecutorConfig) -> Harness {
        let browser = Arc::new(browser);
        let input = Arc::new(input);
        let executor = ToolExecutor::new(
            browser.clone(),
            input.clone(),
            Arc::new(GuardrailPipeline::default()),
            WaitPolicy::default(),
            config,
        );
        Harness {
            browser,
            input,
            executor,
        }
    }

    fn harness(browser: FakeBrowser) -> Harness {
        harness_with(browser, ScriptedInput::new(), ExecutorConfig::default())
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall::new("call_1", name, arguments)
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_reports_url() {
        let h = harness(FakeBrowser::new());
        let text = h
            .executor
            .execute(&call("navigate_to_url", r#"{"url":"https://example.com"}"#))
            .await;

        assert_eq!(text, "Navigated to https://example.com");
        assert_eq!(h.browser.navigations(), vec!["https://example.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_error_is_reported() {
        let h = harness(FakeBrowser::new().with_navigation_error("net::ERR_NAME_NOT_RESOLVED"));
        let text = h
            .executor
            .execute(&call("navigate_to_url", r#"{"url":"https://nowhere.invalid"}"#))
            .await;

        assert!(text.starts_with("Error executing navigate_to_url:"));
        assert!(text.contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_waits_for_login() {
        let browser = FakeBrowser::new();
        browser.script_login([
            LoginStatus {
                is_logged_in: false,
                has_login_form: true,
                indicators: vec![],
            },
            LoginStatus {
                is_logged_in: false,
                has_login_form: true,
                indicators: vec![],
            },
            LoginStatus {
                is_logged_in: true,
                has_login_form: false,
                indicators: vec![],
            },
        ]);
        let h = harness(browser);

        let text = h
            .executor
            .execute(&call("navigate_to_url", r#"{"url":"https://mail.test"}"#))
            .await;

        assert_eq!(text, "Navigated to https://mail.test");
        let notes = h.input.notifications();
        assert!(notes.iter().any(|n| n.starts_with("Login required")));
        assert!(notes.iter().any(|n| n.contains("Login detected")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_after_captcha_waits() {
        let browser = FakeBrowser::new();
        browser.add(
            Locator::Text("Search".to_string()),
            FakeElement::new("button").text("Search"),
        );
        browser.script_captcha([
            CaptchaInfo::detected(CaptchaKind::ReCaptcha),
            CaptchaInfo::none(),
        ]);
        let h = harness(browser);

        let text = h
            .executor
            .execute(&call("click_element", r#"{"element_text":"Search"}"#))
            .await;

        assert_eq!(text, "Clicked 'Search'");
        assert_eq!(h.browser.clicks(), vec!["Search"]);
        assert!(h.input.notifications().iter().any(|n| n.contains("reCAPTCHA")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_missing_element_suggests_page_info() {
        let h = harness(FakeBrowser::new());
        let text = h
            .executor
            .execute(&call("click_element", r#"{"element_text":"Nope"}"#))
            .await;

        assert_eq!(
            text,
            "Could not find element 'Nope'. Call get_page_info to see the elements available on the page."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_by_selector() {
        let browser = FakeBrowser::new();
        browser.add(Locator::css("#go"), FakeElement::new("button").text("Go"));
        let h = harness(browser);

        let text = h
            .executor
            .execute(&call("click_element", r##"{"element_text":"Go","selector":"#go"}"##))
            .await;
        assert_eq!(text, "Clicked 'Go'");

        let missing = h
            .executor
            .execute(&call("click_element", r##"{"element_text":"Go","selector":"#gone"}"##))
            .await;
        assert!(missing.starts_with("Could not click selector '#gone'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_into_resolved_field() {
        let browser = FakeBrowser::new();
        browser.add(
            Locator::css("input[type=\"email\"]"),
            FakeElement::new("input").attr("name", "login"),
        );
        let h = harness(browser);

        let text = h
            .executor
            .execute(&call(
                "type_text",
                r#"{"field_description":"email","text":"me@site.test","selector":""}"#,
            ))
            .await;

        assert_eq!(text, "Typed 'me@site.test' into 'email'");
        assert_eq!(
            h.browser.fills(),
            vec![("login".to_string(), "me@site.test".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_missing_field() {
        let h = harness(FakeBrowser::new());
        let text = h
            .executor
            .execute(&call("type_text", r#"{"field_description":"coupon","text":"X1"}"#))
            .await;
        assert!(text.starts_with("Could not find field 'coupon'."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_and_wait() {
        let h = harness(FakeBrowser::new());

        let scrolled = h
            .executor
            .execute(&call("scroll", r#"{"direction":"up","amount":300}"#))
            .await;
        assert_eq!(scrolled, "Scrolled up by 300px");
        assert_eq!(h.browser.evaluations(), vec!["window.scrollBy(0, -300)"]);

        let waited = h.executor.execute(&call("wait", r#"{"seconds":2}"#)).await;
        assert_eq!(waited, "Waited 2 seconds");

        let negative = h.executor.execute(&call("wait", r#"{"seconds":-1}"#)).await;
        assert!(negative.starts_with("Error executing wait:"));
    }

    #[tokio::test]
    async fn test_page_info_renders_snapshot() {
        let browser = FakeBrowser::new()
            .with_url("https://shop.test/")
            .with_title("Shop")
            .with_html("<html><body><h1>Deals</h1><button>Buy now</button></body></html>");
        let h = harness(browser);

        let text = h.executor.execute(&call("get_page_info", "{}")).await;
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["title"], "Shop");
        assert_eq!(value["headings"][0]["text"], "Deals");
    }

    #[tokio::test]
    async fn test_terminal_tools_echo_arguments() {
        let h = harness(FakeBrowser::new());
        assert_eq!(
            h.executor
                .execute(&call("task_complete", r#"{"result":"42 items"}"#))
                .await,
            "Task completed: 42 items"
        );
        assert_eq!(
            h.executor
                .execute(&call("ask_user", r#"{"question":"Which city?"}"#))
                .await,
            "Question for user: Which city?"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let h = harness(FakeBrowser::new());
        let text = h.executor.execute(&call("download_file", "{}")).await;
        assert_eq!(text, "Unknown tool: download_file");
    }

    #[tokio::test]
    async fn test_injection_arguments_blocked() {
        let h = harness(FakeBrowser::new());
        let text = h
            .executor
            .execute(&call("navigate_to_url", r#"{"url":"javascript:alert(1)"}"#))
            .await;

        assert!(text.starts_with("BLOCKED:"));
        assert!(h.browser.navigations().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_destructive_click_declined() {
        let browser = FakeBrowser::new();
        browser.add(
            Locator::Text("Delete account".to_string()),
            FakeElement::new("button").text("Delete account"),
        );
        let h = harness_with(
            browser,
            ScriptedInput::new().with_confirmation(false),
            ExecutorConfig::default(),
        );

        let text = h
            .executor
            .execute(&call("click_element", r#"{"element_text":"Delete account"}"#))
            .await;

        assert_eq!(text, "Action cancelled by user: Destructive action detected: delete");
        assert!(h.browser.clicks().is_empty());
        assert_eq!(h.input.prompts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destructive_click_confirmed_via_port() {
        let browser = Arc::new(FakeBrowser::new());
        browser.add(
            Locator::Text("Delete account".to_string()),
            FakeElement::new("button").text("Delete account"),
        );
        let mut port = MockInputPort::new();
        port.expect_notify().returning(|_| ());
        port.expect_confirm()
            .withf(|prompt| prompt.starts_with("Allow click_element"))
            .times(1)
            .returning(|_| true);

        let executor = ToolExecutor::new(
            browser.clone(),
            Arc::new(port),
            Arc::new(GuardrailPipeline::default()),
            WaitPolicy::default(),
            ExecutorConfig::default(),
        );
        let text = executor
            .execute(&call("click_element", r#"{"element_text":"Delete account"}"#))
            .await;

        assert_eq!(text, "Clicked 'Delete account'");
        assert_eq!(browser.clicks(), vec!["Delete account"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_confirm_skips_prompt() {
        let browser = FakeBrowser::new();
        browser.add(
            Locator::Text("Remove".to_string()),
            FakeElement::new("button").text("Remove"),
        );
        let h = harness_with(
            browser,
            ScriptedInput::new(),
            ExecutorConfig::default().with_auto_confirm(true),
        );

        let text = h
            .executor
            .execute(&call("click_element", r#"{"element_text":"Remove"}"#))
            .await;

        assert_eq!(text, "Clicked 'Remove'");
        assert!(h.input.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_critical_override_blocks_tool() {
        let browser = Arc::new(FakeBrowser::new());
        let guardrails =
            GuardrailPipeline::new(GuardrailConfig::new().with_tool_risk("scroll", RiskLevel::Critical));
        let executor = ToolExecutor::new(
            browser.clone(),
            Arc::new(ScriptedInput::new()),
            Arc::new(guardrails),
            WaitPolicy::default(),
            ExecutorConfig::default(),
        );

        let text = executor
            .execute(&call("scroll", r#"{"direction":"down"}"#))
            .await;
        assert_eq!(text, "BLOCKED: Tool scroll has a critical risk level");
        assert!(browser.evaluations().is_empty());
    }
}

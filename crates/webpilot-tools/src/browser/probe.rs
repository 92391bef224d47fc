//! Captcha and login probes
//!
//! Each probe is a small fallible check. A probe that errors is logged and
//! treated as "no signal", so the next probe still runs.

use super::{Browser, Locator};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

const RECAPTCHA_SELECTOR: &str = ".g-recaptcha, #recaptcha, [data-sitekey]";
const HCAPTCHA_SELECTOR: &str = r#".h-captcha, [data-sitekey*="hcaptcha"]"#;
const CLOUDFLARE_SELECTOR: &str = "#challenge-form, .cf-browser-verification, [data-ray]";
const CAPTCHA_IFRAME_SELECTOR: &str =
    r#"iframe[src*="recaptcha"], iframe[src*="hcaptcha"], iframe[src*="captcha"]"#;

const CLOUDFLARE_TEXT: &[&str] = &[
    "checking your browser",
    "just a moment",
    "please wait",
    "ddos protection",
    "cloudflare",
];

const CAPTCHA_TEXT: &[&str] = &[
    "captcha",
    "verify you are human",
    "i am not a robot",
    "robot check",
];

const LOGIN_PATHS: &[&str] = &["/login", "/signin", "/sign-in", "/log-in", "/auth"];

const IDENTITY_FIELD_SELECTOR: &str = concat!(
    r#"input[type="email"], input[type="tel"], "#,
    r#"input[type="text"][name*="email" i], input[type="text"][name*="login" i], "#,
    r#"input[type="text"][placeholder*="email" i], input[type="text"][placeholder*="phone" i]"#
);
const PASSWORD_FIELD_SELECTOR: &str = r#"input[type="password"]"#;
const PROFILE_SELECTOR: &str = concat!(
    r#"[class*="profile" i], [class*="user" i], [class*="account" i], "#,
    r#"[id*="profile" i], [id*="user" i], [id*="account" i]"#
);

const LOGGED_IN_TEXT: &[&str] = &[
    "profile",
    "my profile",
    "logout",
    "log out",
    "sign out",
    "settings",
    "account",
    "welcome",
];

const LOGOUT_LABELS: &[&str] = &["logout", "log out", "sign out"];

/// Kind of bot challenge detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptchaKind {
    /// Google reCAPTCHA widget
    ReCaptcha,
    /// hCaptcha widget
    HCaptcha,
    /// Cloudflare browser check
    Cloudflare,
    /// Any other captcha iframe
    Generic,
}

impl CaptchaKind {
    /// Human-readable name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReCaptcha => "reCAPTCHA",
            Self::HCaptcha => "hCaptcha",
            Self::Cloudflare => "Cloudflare",
            Self::Generic => "Generic Captcha",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::ReCaptcha => "reCAPTCHA detected. Please solve it in the browser window.",
            Self::HCaptcha => "hCaptcha detected. Please solve it in the browser window.",
            Self::Cloudflare => {
                "Cloudflare check detected. Please wait for it to finish in the browser window."
            }
            Self::Generic => "Bot check detected. Please complete it in the browser window.",
        }
    }
}

/// Result of a captcha probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaInfo {
    /// Whether a challenge is present
    pub has_captcha: bool,
    /// Which challenge, when present
    pub kind: Option<CaptchaKind>,
    /// Message to show the user
    pub message: Option<String>,
}

impl CaptchaInfo {
    /// No challenge on the page
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A detected challenge
    #[must_use]
    pub fn detected(kind: CaptchaKind) -> Self {
        Self {
            has_captcha: true,
            kind: Some(kind),
            message: Some(kind.message().to_string()),
        }
    }
}

/// Result of a login probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStatus {
    /// Logged-in markers were found
    pub is_logged_in: bool,
    /// A login form or login URL was found
    pub has_login_form: bool,
    /// Which signals fired
    pub indicators: Vec<String>,
}

impl LoginStatus {
    /// The page is asking for credentials
    #[must_use]
    pub fn needs_login(&self) -> bool {
        self.has_login_form && !self.is_logged_in
    }

    /// The user is past the login step
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.is_logged_in && !self.has_login_form
    }
}

async fn matches_any<B: Browser + ?Sized>(browser: &B, selector: &str) -> Result<bool> {
    Ok(!browser.query_all(&Locator::css(selector)).await?.is_empty())
}

fn log_failed(probe: &str, outcome: Result<bool>) -> bool {
    outcome.unwrap_or_else(|e| {
        debug!(probe, error = %e, "Probe failed, treating as no signal");
        false
    })
}

/// Detect reCAPTCHA, hCaptcha, Cloudflare and generic captcha challenges
pub async fn detect_captcha<B: Browser + ?Sized>(browser: &B) -> Result<CaptchaInfo> {
    if log_failed("recaptcha", matches_any(browser, RECAPTCHA_SELECTOR).await) {
        return Ok(CaptchaInfo::detected(CaptchaKind::ReCaptcha));
    }
    if log_failed("hcaptcha", matches_any(browser, HCAPTCHA_SELECTOR).await) {
        return Ok(CaptchaInfo::detected(CaptchaKind::HCaptcha));
    }

    let text = match browser.body_text().await {
        Ok(text) => text.to_lowercase(),
        Err(e) => {
            debug!(error = %e, "Could not read page text for captcha probe");
            return Ok(CaptchaInfo::none());
        }
    };

    if CLOUDFLARE_TEXT.iter().any(|t| text.contains(t))
        && log_failed("cloudflare", matches_any(browser, CLOUDFLARE_SELECTOR).await)
    {
        return Ok(CaptchaInfo::detected(CaptchaKind::Cloudflare));
    }

    if CAPTCHA_TEXT.iter().any(|t| text.contains(t))
        && log_failed("captcha_iframe", matches_any(browser, CAPTCHA_IFRAME_SELECTOR).await)
    {
        return Ok(CaptchaInfo::detected(CaptchaKind::Generic));
    }

    Ok(CaptchaInfo::none())
}

async fn has_logout_control<B: Browser + ?Sized>(browser: &B) -> Result<bool> {
    for label in LOGOUT_LABELS {
        for scope in ["button", "a"] {
            if browser
                .query_first(&Locator::has_text(scope, *label))
                .await?
                .is_some()
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Detect login forms and logged-in markers
pub async fn detect_login<B: Browser + ?Sized>(browser: &B) -> Result<LoginStatus> {
    let mut status = LoginStatus::default();

    let url = browser
        .current_url()
        .await
        .map(|u| u.to_lowercase())
        .unwrap_or_default();
    let text = browser
        .body_text()
        .await
        .map(|t| t.to_lowercase())
        .unwrap_or_default();

    let has_login_url = LOGIN_PATHS.iter().any(|path| url.contains(path));
    let has_identity_field = log_failed(
        "identity_field",
        matches_any(browser, IDENTITY_FIELD_SELECTOR).await,
    );
    let has_password_field = log_failed(
        "password_field",
        matches_any(browser, PASSWORD_FIELD_SELECTOR).await,
    );

    if has_login_url {
        status.has_login_form = true;
        status.indicators.push("URL points to a login page".to_string());
    } else if has_identity_field && has_password_field {
        status.has_login_form = true;
        status
            .indicators
            .push("Login form found (email/phone + password)".to_string());
    }

    let has_logged_in_text = LOGGED_IN_TEXT.iter().any(|t| text.contains(t));
    let has_profile_elements = log_failed("profile", matches_any(browser, PROFILE_SELECTOR).await);
    let has_logout = log_failed("logout", has_logout_control(browser).await);

    if has_logged_in_text {
        status.indicators.push("Logged-in text found".to_string());
    }
    if has_profile_elements {
        status.indicators.push("Profile elements found".to_string());
    }
    if has_logout {
        status.indicators.push("Logout control found".to_string());
    }
    status.is_logged_in = has_logged_in_text || has_profile_elements || has_logout;

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBrowser, FakeElement};

    #[tokio::test]
    async fn test_no_captcha_on_plain_page() {
        let browser = FakeBrowser::new().with_body_text("Welcome to the shop");
        let info = detect_captcha(&browser).await.unwrap();
        assert!(!info.has_captcha);
        assert!(info.kind.is_none());
    }

    #[tokio::test]
    async fn test_recaptcha_detected_first() {
        let browser = FakeBrowser::new();
        browser.add(Locator::css(RECAPTCHA_SELECTOR), FakeElement::new("div"));
        browser.add(Locator::css(HCAPTCHA_SELECTOR), FakeElement::new("div"));

        let info = detect_captcha(&browser).await.unwrap();
        assert_eq!(info.kind, Some(CaptchaKind::ReCaptcha));
        assert!(info.message.unwrap().contains("reCAPTCHA"));
    }

    #[tokio::test]
    async fn test_cloudflare_needs_text_and_marker() {
        let text_only = FakeBrowser::new().with_body_text("Just a moment...");
        assert!(!detect_captcha(&text_only).await.unwrap().has_captcha);

        let browser = FakeBrowser::new().with_body_text("Just a moment...");
        browser.add(Locator::css(CLOUDFLARE_SELECTOR), FakeElement::new("form"));
        let info = detect_captcha(&browser).await.unwrap();
        assert_eq!(info.kind, Some(CaptchaKind::Cloudflare));
    }

    #[tokio::test]
    async fn test_generic_captcha_iframe() {
        let browser = FakeBrowser::new().with_body_text("Please verify you are human");
        browser.add(Locator::css(CAPTCHA_IFRAME_SELECTOR), FakeElement::new("iframe"));
        let info = detect_captcha(&browser).await.unwrap();
        assert_eq!(info.kind, Some(CaptchaKind::Generic));
    }

    #[tokio::test]
    async fn test_failing_probe_falls_through() {
        let browser = FakeBrowser::new().with_body_text("just a moment");
        browser.fail_locator(Locator::css(RECAPTCHA_SELECTOR));
        browser.add(Locator::css(CLOUDFLARE_SELECTOR), FakeElement::new("div"));

        let info = detect_captcha(&browser).await.unwrap();
        assert_eq!(info.kind, Some(CaptchaKind::Cloudflare));
    }

    #[tokio::test]
    async fn test_login_url_means_login_form() {
        let browser = FakeBrowser::new().with_url("https://example.com/login?next=/");
        let status = detect_login(&browser).await.unwrap();
        assert!(status.has_login_form);
        assert!(!status.is_logged_in);
        assert!(status.needs_login());
    }

    #[tokio::test]
    async fn test_login_form_fields() {
        let browser = FakeBrowser::new().with_url("https://example.com/");
        browser.add(Locator::css(IDENTITY_FIELD_SELECTOR), FakeElement::new("input"));
        browser.add(Locator::css(PASSWORD_FIELD_SELECTOR), FakeElement::new("input"));

        let status = detect_login(&browser).await.unwrap();
        assert!(status.has_login_form);

        let password_only = FakeBrowser::new().with_url("https://example.com/");
        password_only.add(Locator::css(PASSWORD_FIELD_SELECTOR), FakeElement::new("input"));
        assert!(!detect_login(&password_only).await.unwrap().has_login_form);
    }

    #[tokio::test]
    async fn test_logged_in_markers() {
        let browser = FakeBrowser::new()
            .with_url("https://example.com/home")
            .with_body_text("Welcome back, Sam");
        browser.add(Locator::has_text("a", "logout"), FakeElement::new("a").text("Logout"));

        let status = detect_login(&browser).await.unwrap();
        assert!(status.is_logged_in);
        assert!(status.is_resolved());
        assert_eq!(status.indicators.len(), 2);
    }
}

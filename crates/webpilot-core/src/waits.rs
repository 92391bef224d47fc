//! Bounded waits for captcha and login challenges
//!
//! When a page puts up a bot check or a login form the agent cannot get past
//! it alone. [`ChallengeWatcher`] hands the browser to the user and polls
//! until the challenge is gone, the user presses the cancel key, or the
//! timeout runs out. None of these outcomes is an error.
//!
//! Each cycle:
//! 1. wait up to `poll_interval` for a cancel key,
//! 2. sleep `sleep_interval`,
//! 3. if the URL moved, sleep `settle_delay` and re-probe at once,
//! 4. give up once the timeout has elapsed,
//! 5. re-probe anyway every `recheck_interval`.

use crate::interaction::InputPort;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use webpilot_tools::{Browser, CaptchaInfo, LoginStatus};

/// Timings of the challenge polling loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Window in which a cancel key press is noticed
    pub poll_interval: Duration,
    /// Sleep between polls
    pub sleep_interval: Duration,
    /// Re-probe at least this often even if the URL does not move
    pub recheck_interval: Duration,
    /// Pause after a URL change before probing
    pub settle_delay: Duration,
    /// Give up on a captcha after this long
    pub captcha_timeout: Duration,
    /// Give up on a login after this long
    pub login_timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            sleep_interval: Duration::from_millis(2500),
            recheck_interval: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            captcha_timeout: Duration::from_secs(300),
            login_timeout: Duration::from_secs(600),
        }
    }
}

impl WaitPolicy {
    /// Create a policy with default timings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the captcha timeout
    #[must_use]
    pub fn with_captcha_timeout(mut self, timeout: Duration) -> Self {
        self.captcha_timeout = timeout;
        self
    }

    /// Set the login timeout
    #[must_use]
    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set the recheck interval
    #[must_use]
    pub fn with_recheck_interval(mut self, interval: Duration) -> Self {
        self.recheck_interval = interval;
        self
    }

    /// Set the poll and sleep intervals of one cycle
    #[must_use]
    pub fn with_cycle(mut self, poll: Duration, sleep: Duration) -> Self {
        self.poll_interval = poll;
        self.sleep_interval = sleep;
        self
    }

    /// Set the pause after a URL change
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// How a challenge wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The challenge is gone
    Resolved,
    /// The user pressed the cancel key
    Cancelled,
    /// The timeout ran out first
    TimedOut,
}

impl WaitOutcome {
    /// The challenge was cleared
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Challenge {
    Captcha,
    Login,
}

impl Challenge {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Captcha => "captcha",
            Self::Login => "login",
        }
    }
}

/// One probe result: whether the challenge is gone plus a status line
struct Probe {
    resolved: bool,
    status: Option<String>,
}

impl Probe {
    fn unresolved() -> Self {
        Self {
            resolved: false,
            status: None,
        }
    }
}

fn login_status_line(status: &LoginStatus) -> String {
    format!(
        "Logged in: {}, login form: {}",
        if status.is_logged_in { "yes" } else { "waiting" },
        if status.has_login_form { "present" } else { "absent" },
    )
}

/// Polls the browser while the user clears a challenge by hand
#[derive(Clone)]
pub struct ChallengeWatcher {
    browser: Arc<dyn Browser>,
    input: Arc<dyn InputPort>,
    policy: WaitPolicy,
}

impl ChallengeWatcher {
    /// Create a watcher
    pub fn new(browser: Arc<dyn Browser>, input: Arc<dyn InputPort>, policy: WaitPolicy) -> Self {
        Self {
            browser,
            input,
            policy,
        }
    }

    /// Timings in use
    #[must_use]
    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Wait until the captcha described by `info` is cleared
    pub async fn wait_for_captcha(&self, info: &CaptchaInfo) -> WaitOutcome {
        let message = info
            .message
            .as_deref()
            .unwrap_or("Bot check detected. Please complete it in the browser window.");
        self.input
            .notify(&format!("{message} Press Enter to skip waiting."));
        self.watch(Challenge::Captcha, self.policy.captcha_timeout)
            .await
    }

    /// Wait until the user has logged in
    pub async fn wait_for_login(&self) -> WaitOutcome {
        self.input.notify(
            "Login required. Please sign in in the browser window. Press Enter to skip waiting.",
        );
        self.watch(Challenge::Login, self.policy.login_timeout).await
    }

    async fn current_url(&self) -> String {
        self.browser.current_url().await.unwrap_or_else(|e| {
            debug!(error = %e, "Could not read URL while waiting");
            String::new()
        })
    }

    async fn probe(&self, challenge: Challenge) -> Probe {
        match challenge {
            Challenge::Captcha => match self.browser.check_captcha().await {
                Ok(info) => Probe {
                    resolved: !info.has_captcha,
                    status: None,
                },
                Err(e) => {
                    debug!(error = %e, "Captcha probe failed while waiting");
                    Probe::unresolved()
                }
            },
            Challenge::Login => match self.browser.check_login_status().await {
                Ok(status) => {
                    if status.is_resolved() && !status.indicators.is_empty() {
                        self.input
                            .notify(&format!("Signals: {}", status.indicators.join(", ")));
                    }
                    Probe {
                        resolved: status.is_resolved(),
                        status: Some(login_status_line(&status)),
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Login probe failed while waiting");
                    Probe::unresolved()
                }
            },
        }
    }

    async fn watch(&self, challenge: Challenge, timeout: Duration) -> WaitOutcome {
        let kind = challenge.as_str();
        let start = Instant::now();
        let mut last_check = start;
        let mut last_status: Option<String> = None;
        let mut initial_url = self.current_url().await;
        info!(challenge = kind, timeout_secs = timeout.as_secs(), "Waiting for user");

        loop {
            if self.input.cancel_requested(self.policy.poll_interval).await {
                self.input.notify(&format!("Skipping the {kind} wait."));
                info!(challenge = kind, "Wait cancelled by user");
                return WaitOutcome::Cancelled;
            }
            sleep(self.policy.sleep_interval).await;

            let url = self.current_url().await;
            if url != initial_url {
                debug!(challenge = kind, url = %url, "URL changed, rechecking");
                sleep(self.policy.settle_delay).await;
                if self.probe(challenge).await.resolved {
                    return self.resolved(challenge);
                }
                initial_url = url;
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                self.input.notify(&format!(
                    "Timed out after {} seconds waiting for {kind}. Continuing anyway.",
                    timeout.as_secs()
                ));
                info!(challenge = kind, "Wait timed out");
                return WaitOutcome::TimedOut;
            }

            if last_check.elapsed() >= self.policy.recheck_interval {
                let probe = self.probe(challenge).await;
                if probe.resolved {
                    return self.resolved(challenge);
                }
                last_check = Instant::now();
                let remaining = timeout.saturating_sub(elapsed).as_secs();
                match (challenge, probe.status) {
                    (Challenge::Captcha, _) => self.input.notify(&format!(
                        "Waiting for the captcha... (~{remaining} s left) | Press Enter to skip"
                    )),
                    (Challenge::Login, Some(status)) if last_status.as_ref() != Some(&status) => {
                        self.input.notify(&format!(
                            "{status} (~{remaining} s left) | Press Enter to skip"
                        ));
                        last_status = Some(status);
                    }
                    (Challenge::Login, _) => {}
                }
            }
        }
    }

    fn resolved(&self, challenge: Challenge) -> WaitOutcome {
        let message = match challenge {
            Challenge::Captcha => "Check passed. Continuing.",
            Challenge::Login => "Login detected. Continuing.",
        };
        self.input.notify(message);
        info!(challenge = challenge.as_str(), "Challenge resolved");
        WaitOutcome::Resolved
    }
}

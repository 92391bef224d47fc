//! User interaction port
//!
//! The agent needs a human in three places: confirming a risky tool call,
//! answering an `ask_user` question, and finishing a captcha or login by hand.
//! The terminal front-end implements this trait; tests script it.

use async_trait::async_trait;
use std::time::Duration;

/// Channel to the person supervising the agent
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InputPort: Send + Sync {
    /// Ask a question and wait for one line. `None` means the input closed.
    async fn read_line(&self, prompt: &str) -> Option<String>;

    /// Ask a yes/no question. Anything but an explicit yes is a no.
    async fn confirm(&self, prompt: &str) -> bool;

    /// Wait up to `window` for a cancel key press
    async fn cancel_requested(&self, window: Duration) -> bool;

    /// Show a status line
    fn notify(&self, message: &str);
}

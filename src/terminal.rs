//! Terminal-bound input port
//!
//! Prompts go through `inquire` on a blocking thread. The cancel check puts
//! the terminal in raw mode for one poll window and looks for Enter.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use inquire::{Confirm, Text};
use std::io::IsTerminal;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use webpilot_core::InputPort;

/// Input port backed by the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    /// Create a terminal input port
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InputPort for TerminalInput {
    async fn read_line(&self, prompt: &str) -> Option<String> {
        let prompt = prompt.to_string();
        match tokio::task::spawn_blocking(move || Text::new(&prompt).prompt()).await {
            Ok(Ok(line)) => Some(line),
            Ok(Err(e)) => {
                debug!(error = %e, "Prompt closed");
                None
            }
            Err(e) => {
                warn!(error = %e, "Prompt task failed");
                None
            }
        }
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new(&prompt).with_default(false).prompt()
        })
        .await;
        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                debug!(error = %e, "Confirmation closed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Confirmation task failed");
                false
            }
        }
    }

    async fn cancel_requested(&self, window: Duration) -> bool {
        if !std::io::stdin().is_terminal() {
            tokio::time::sleep(window).await;
            return false;
        }
        match tokio::task::spawn_blocking(move || poll_enter(window)).await {
            Ok(Ok(pressed)) => pressed,
            Ok(Err(e)) => {
                debug!(error = %e, "Key poll failed");
                tokio::time::sleep(window).await;
                false
            }
            Err(e) => {
                warn!(error = %e, "Key poll task failed");
                false
            }
        }
    }

    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

/// Leaves raw mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Wait up to `window` for Enter. Ctrl-C counts as a cancel too, since raw
/// mode swallows the signal.
fn poll_enter(window: Duration) -> std::io::Result<bool> {
    let _raw = RawModeGuard::enable()?;
    let deadline = Instant::now() + window;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || !event::poll(remaining)? {
            return Ok(false);
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(true),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(true)
                }
                _ => {}
            }
        }
    }
}

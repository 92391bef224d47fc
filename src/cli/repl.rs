//! Interactive task loop
//!
//! One browser session serves every task of the REPL. The session is closed
//! on every exit path: quit, end of input, Ctrl-C and errors.

use crate::settings::{self, AppConfig};
use crate::terminal::TerminalInput;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use webpilot_core::{InputPort, Orchestrator, TaskOutcome};
use webpilot_llm::OpenRouterProvider;
use webpilot_tools::WebDriverBrowser;

const SEPARATOR_WIDTH: usize = 50;
const QUIT_WORDS: &[&str] = &["quit", "exit", "q"];

/// Run the interactive REPL
pub async fn run(config: &AppConfig) -> Result<()> {
    let input = Arc::new(TerminalInput::new());
    let orchestrator = start(config, input.clone()).await?;

    println!("WebPilot v{}", env!("CARGO_PKG_VERSION"));
    println!("Describe a task for the browser. Type 'quit' to exit.\n");

    let result = prompt_loop(&orchestrator, input.as_ref()).await;
    close(&orchestrator).await;
    result
}

/// Run a single task and exit
pub async fn run_once(config: &AppConfig, task: &str) -> Result<()> {
    let input = Arc::new(TerminalInput::new());
    let orchestrator = start(config, input).await?;

    match run_task(&orchestrator, task).await {
        Some(outcome) => print_outcome(&outcome),
        None => println!("\nInterrupted."),
    }

    close(&orchestrator).await;
    Ok(())
}

async fn start(config: &AppConfig, input: Arc<TerminalInput>) -> Result<Orchestrator> {
    let api_key = settings::api_key()?;
    let provider = OpenRouterProvider::new(config.openrouter_config(api_key))
        .context("Failed to create the OpenRouter provider")?;

    let browser = Arc::new(WebDriverBrowser::new(config.browser.clone()));
    browser.start().await.with_context(|| {
        format!(
            "Failed to start the browser. Is a WebDriver server running at {}?",
            config.browser.webdriver_url
        )
    })?;

    info!(model = %config.llm.model, "Agent ready");
    Ok(Orchestrator::new(
        Arc::new(provider),
        browser,
        input,
        config.orchestrator_config(),
    ))
}

async fn prompt_loop(orchestrator: &Orchestrator, input: &dyn InputPort) -> Result<()> {
    loop {
        let Some(line) = input.read_line("Task:").await else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if is_quit(task) {
            break;
        }

        match run_task(orchestrator, task).await {
            Some(outcome) => print_outcome(&outcome),
            None => {
                println!("\nInterrupted.");
                break;
            }
        }
    }
    Ok(())
}

/// Run a task unless Ctrl-C arrives first
async fn run_task(orchestrator: &Orchestrator, task: &str) -> Option<TaskOutcome> {
    tokio::select! {
        outcome = orchestrator.run(task) => Some(outcome),
        _ = tokio::signal::ctrl_c() => {
            warn!("Task interrupted");
            None
        }
    }
}

async fn close(orchestrator: &Orchestrator) {
    if let Err(e) = orchestrator.shutdown().await {
        warn!(error = %e, "Failed to close the browser session");
    }
}

fn is_quit(line: &str) -> bool {
    QUIT_WORDS.contains(&line.to_lowercase().as_str())
}

fn print_outcome(outcome: &TaskOutcome) {
    println!("\nResult: {}", outcome.result);
    println!("{}", "-".repeat(SEPARATOR_WIDTH));
}

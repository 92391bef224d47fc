//! CLI module for WebPilot
//!
//! Provides interactive commands:
//! - `repl`: Prompt for tasks and run them one after another (default)
//! - `run`: Run a single task and exit
//! - `doctor`: Print the resolved configuration and check the WebDriver server

use clap::{Parser, Subcommand};

pub mod doctor;
pub mod repl;

/// WebPilot browser agent CLI
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(about = "LLM-driven browser agent")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive task prompt (default)
    Repl,
    /// Run one task and exit
    Run {
        /// Task description, e.g. "find the cheapest flight to Lisbon"
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Run configuration and connectivity checks
    Doctor,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = crate::settings::load_config()?;

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl::run(&config).await,
        Commands::Run { task } => repl::run_once(&config, &task.join(" ")).await,
        Commands::Doctor => doctor::run(&config).await,
    }
}

//! Error types for webpilot-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Element, tool or resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Tool execution failed
    #[error("execution failed: {0}")]
    Execution(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Browser driver failure
    #[error("browser error: {0}")]
    Browser(String),

    /// Browser session has not been started or was closed
    #[error("browser session not started")]
    NotStarted,

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for webpilot-llm

use thiserror::Error;

/// Substrings that mark a provider failure as a quota or permission problem.
///
/// Matched case-insensitively against the message of API and provider errors.
pub const FATAL_INDICATORS: &[&str] = &[
    "402",
    "403",
    "credits",
    "insufficient balance",
    "insufficient",
    "permission",
    "licenses",
];

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Quota, billing or permission failure (HTTP 402/403)
    #[error("quota or permission error: {0}")]
    Quota(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimit,

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Provider-specific failure
    #[error("provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Whether retrying with the same provider is pointless.
    ///
    /// Quota failures are fatal. Free-text API and provider errors are fatal
    /// when they carry a quota/permission indicator. Everything else,
    /// timeouts and rate limits included, is transient.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Quota(_) => true,
            Self::Api(message) | Self::Provider(message) => is_fatal_message(message),
            _ => false,
        }
    }
}

/// Check free-form error text for quota/permission indicators
#[must_use]
pub fn is_fatal_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    FATAL_INDICATORS.iter().any(|needle| lower.contains(needle))
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

//! Mock LLM Provider for testing
//!
//! Replays queued responses and errors in order and records every request
//! it receives.

use crate::completion::{ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Scripted {
    Reply(ToolCompletionResponse),
    Fail(Error),
}

/// A mock LLM provider that returns queued responses or default empty ones.
#[derive(Clone)]
pub struct MockProvider {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ToolCompletionRequest>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response to the queue.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Reply(response));
    }

    /// Add an error to the queue.
    pub fn add_error(&self, error: Error) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Scripted::Fail(error));
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ToolCompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of completion calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(ToolCompletionResponse {
                content: Some("mock response".to_string()),
                finish_reason: Some("stop".to_string()),
                model: "mock-model".to_string(),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionRequest;

    fn request() -> ToolCompletionRequest {
        ToolCompletionRequest::new(CompletionRequest::new(""), Vec::new())
    }

    #[tokio::test]
    async fn test_replays_in_order() {
        let mock = MockProvider::new();
        mock.add_tool_response(ToolCompletionResponse::text("first"));
        mock.add_error(Error::RateLimit);

        let first = mock.complete_with_tools(request()).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("first"));

        let second = mock.complete_with_tools(request()).await;
        assert!(matches!(second, Err(Error::RateLimit)));

        let fallback = mock.complete_with_tools(request()).await.unwrap();
        assert_eq!(fallback.content.as_deref(), Some("mock response"));
        assert_eq!(mock.call_count(), 3);
    }
}

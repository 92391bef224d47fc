use super::types::{
    OpenRouterConfig, OpenRouterError, OpenRouterFunction, OpenRouterFunctionCall,
    OpenRouterMessage, OpenRouterRequest, OpenRouterResponse, OpenRouterTool, OpenRouterToolCall,
};
use crate::completion::{TokenUsage, ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::message::{Message, MessageRole};
use crate::provider::LlmProvider;
use crate::tools::{ToolCall, ToolChoice, ToolDefinition};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

// ============================================================================
// Security Utilities
// ============================================================================

/// Sanitize API error messages
pub(crate) fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check your API key configuration.".to_string();
    }

    if error.len() > 300 {
        format!("{}...(truncated)", crate::util::truncate_safe(error, 300))
    } else {
        error.to_string()
    }
}

/// Map an unsuccessful HTTP status onto the error taxonomy
pub(crate) fn classify_status(status: StatusCode, message: &str) -> Error {
    let message = sanitize_api_error(message);
    match status.as_u16() {
        402 | 403 => Error::Quota(format!("HTTP {}: {message}", status.as_u16())),
        429 => Error::RateLimit,
        code => Error::Api(format!("HTTP {code}: {message}")),
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// OpenRouter LLM provider
pub struct OpenRouterProvider {
    client: Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider
    ///
    /// # Errors
    /// Returns an error if the API key is empty or the HTTP client cannot be
    /// created.
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::NotConfigured("OpenRouter API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Convert our message to OpenRouter format
    pub(crate) fn convert_message(msg: &Message) -> OpenRouterMessage {
        let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
            msg.tool_calls
                .iter()
                .map(|call| OpenRouterToolCall {
                    id: call.id.clone(),
                    r#type: "function".to_string(),
                    function: OpenRouterFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        });

        // Assistant turns that only carry tool calls are sent with null content
        let content = if msg.content.is_empty() && msg.role == MessageRole::Assistant {
            None
        } else {
            Some(msg.content.clone())
        };

        OpenRouterMessage {
            role: msg.role.as_str().to_string(),
            content,
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls,
        }
    }

    /// Convert tool definition to OpenRouter format
    fn convert_tool(tool: &ToolDefinition) -> OpenRouterTool {
        OpenRouterTool {
            r#type: "function".to_string(),
            function: OpenRouterFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    /// Convert tool choice to OpenRouter format
    fn convert_tool_choice(choice: &ToolChoice) -> serde_json::Value {
        match choice {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::None => serde_json::json!("none"),
            ToolChoice::Required => serde_json::json!("required"),
            ToolChoice::Tool(name) => serde_json::json!({
                "type": "function",
                "function": {"name": name}
            }),
        }
    }

    /// Make API request
    async fn request(&self, body: &OpenRouterRequest) -> Result<OpenRouterResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        if let Some(app_name) = &self.config.app_name {
            request = request.header("X-Title", app_name);
        }

        let response = request.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.config.timeout.as_millis() as u64)
            } else {
                Error::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenRouterError>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| text.clone());
            let error = classify_status(status, &message);
            warn!(status = status.as_u16(), fatal = error.is_fatal(), "OpenRouter request failed");
            return Err(error);
        }

        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.request.model, tools = request.tools.len()))]
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        let model = if request.request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.request.model
        };

        let messages: Vec<OpenRouterMessage> = request
            .request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect();

        let (tools, tool_choice) = if request.tools.is_empty() {
            (None, None)
        } else {
            (
                Some(request.tools.iter().map(Self::convert_tool).collect()),
                Some(Self::convert_tool_choice(&request.tool_choice)),
            )
        };

        let openrouter_request = OpenRouterRequest {
            model: model.to_string(),
            messages,
            max_tokens: request.request.max_tokens,
            temperature: request.request.temperature.or(self.config.temperature),
            tools,
            tool_choice,
        };

        debug!("Sending tool request to OpenRouter API");

        let response = self.request(&openrouter_request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ToolCompletionResponse {
            content: choice.message.content.filter(|c| !c.is_empty()),
            tool_calls,
            usage,
            finish_reason: choice.finish_reason,
            model: response.model,
        })
    }
}

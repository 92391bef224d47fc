use super::provider::{classify_status, sanitize_api_error, OpenRouterProvider};
use super::types::{OpenRouterConfig, DEFAULT_MODEL};
use crate::error::Error;
use crate::message::Message;
use crate::tools::ToolCall;
use reqwest::StatusCode;
use std::time::Duration;

#[test]
fn test_config_builder() {
    let config = OpenRouterConfig::new("test-key")
        .with_model("openai/gpt-4o")
        .with_timeout(Duration::from_secs(60))
        .with_app_name("TestApp");

    assert_eq!(config.api_key, "test-key");
    assert_eq!(config.default_model, "openai/gpt-4o");
    assert_eq!(config.app_name, Some("TestApp".to_string()));
}

#[test]
fn test_default_model() {
    let config = OpenRouterConfig::new("k");
    assert_eq!(config.default_model, DEFAULT_MODEL);
}

#[test]
fn test_debug_masks_key() {
    let config = OpenRouterConfig::new("sk-or-1234567890abcdefghij");
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("1234567890"));
    assert!(rendered.contains("sk-o...ghij"));
}

#[test]
fn test_convert_message() {
    let msg = Message::assistant("Hello!");
    let converted = OpenRouterProvider::convert_message(&msg);
    assert_eq!(converted.role, "assistant");
    assert_eq!(converted.content.as_deref(), Some("Hello!"));
    assert!(converted.tool_calls.is_none());
}

#[test]
fn test_convert_assistant_tool_calls() {
    let msg = Message::assistant_with_tool_calls(
        "",
        vec![ToolCall::new("call_9", "scroll", r#"{"direction":"down"}"#)],
    );
    let converted = OpenRouterProvider::convert_message(&msg);
    assert!(converted.content.is_none());

    let calls = converted.tool_calls.unwrap();
    assert_eq!(calls[0].id, "call_9");
    assert_eq!(calls[0].r#type, "function");
    assert_eq!(calls[0].function.name, "scroll");
}

#[test]
fn test_convert_tool_response_keeps_call_id() {
    let msg = Message::tool_response("call_9", "Scrolled down by 500px");
    let converted = OpenRouterProvider::convert_message(&msg);
    assert_eq!(converted.role, "tool");
    assert_eq!(converted.tool_call_id.as_deref(), Some("call_9"));
}

#[test]
fn test_classify_status() {
    let quota = classify_status(StatusCode::PAYMENT_REQUIRED, "Insufficient credits");
    assert!(matches!(quota, Error::Quota(_)));
    assert!(quota.is_fatal());

    let forbidden = classify_status(StatusCode::FORBIDDEN, "model not allowed");
    assert!(forbidden.is_fatal());

    assert!(matches!(
        classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
        Error::RateLimit
    ));

    let server = classify_status(StatusCode::BAD_GATEWAY, "upstream failed");
    assert!(matches!(server, Error::Api(_)));
    assert!(!server.is_fatal());
}

#[test]
fn test_sanitize_api_error() {
    assert!(sanitize_api_error("Invalid API key provided").contains("authentication"));
    let long = "x".repeat(400);
    assert!(sanitize_api_error(&long).ends_with("...(truncated)"));
}

#[test]
fn test_empty_key_is_not_configured() {
    let result = OpenRouterProvider::new(OpenRouterConfig::new("  "));
    assert!(matches!(result, Err(Error::NotConfigured(_))));

    assert!(OpenRouterProvider::new(OpenRouterConfig::new("sk-or-test")).is_ok());
}

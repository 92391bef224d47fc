//! Tool types for LLM function calling
//!
//! This module defines the types used for LLM tool/function calling capabilities.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names listed under `required` in the parameter schema
    #[must_use]
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// A tool call requested by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Create a tool call
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    /// Arguments as a JSON object.
    ///
    /// Models occasionally double-encode the arguments string or send
    /// garbage; both degrade to an empty object instead of failing.
    #[must_use]
    pub fn arguments_value(&self) -> serde_json::Value {
        let empty = || serde_json::Value::Object(serde_json::Map::new());
        match serde_json::from_str::<serde_json::Value>(&self.arguments) {
            Ok(serde_json::Value::String(inner)) => serde_json::from_str(&inner)
                .ok()
                .filter(serde_json::Value::is_object)
                .unwrap_or_else(empty),
            Ok(value) if value.is_object() => value,
            _ => empty(),
        }
    }
}

/// Tool choice strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Don't use tools
    None,
    /// Force a specific tool
    Required,
    /// Use a specific tool by name
    Tool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new(
            "navigate_to_url",
            "Open a URL",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string"}
                },
                "required": ["url"]
            }),
        );

        assert_eq!(tool.name, "navigate_to_url");
        assert_eq!(tool.required_parameters(), vec!["url"]);
    }

    #[test]
    fn test_tool_call_parse_arguments() {
        let tool_call = ToolCall::new("call_123", "navigate_to_url", r#"{"url": "https://example.com"}"#);

        #[derive(Deserialize)]
        struct Args {
            url: String,
        }

        let args: Args = tool_call.parse_arguments().unwrap();
        assert_eq!(args.url, "https://example.com");
    }

    #[test]
    fn test_arguments_value_tolerates_bad_input() {
        let garbage = ToolCall::new("1", "scroll", "not json");
        assert_eq!(garbage.arguments_value(), serde_json::json!({}));

        let double = ToolCall::new("2", "scroll", r#""{\"direction\":\"up\"}""#);
        assert_eq!(double.arguments_value()["direction"], "up");

        let array = ToolCall::new("3", "scroll", "[1,2]");
        assert_eq!(array.arguments_value(), serde_json::json!({}));
    }

    #[test]
    fn test_tool_choice_default() {
        let choice = ToolChoice::default();
        assert!(matches!(choice, ToolChoice::Auto));
    }
}

//! Browser tool catalogue
//!
//! The eight actions the model may request, as a typed enum. Parsing a
//! model-issued call into a [`BrowserTool`] replaces string dispatch: every
//! tool has a declared argument shape and match arms are exhaustive.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use webpilot_llm::ToolDefinition;

/// `navigate_to_url`
pub const NAVIGATE_TO_URL: &str = "navigate_to_url";
/// `click_element`
pub const CLICK_ELEMENT: &str = "click_element";
/// `type_text`
pub const TYPE_TEXT: &str = "type_text";
/// `get_page_info`
pub const GET_PAGE_INFO: &str = "get_page_info";
/// `wait`
pub const WAIT: &str = "wait";
/// `scroll`
pub const SCROLL: &str = "scroll";
/// `task_complete`
pub const TASK_COMPLETE: &str = "task_complete";
/// `ask_user`
pub const ASK_USER: &str = "ask_user";

/// Every tool name, in declaration order
pub const TOOL_NAMES: &[&str] = &[
    NAVIGATE_TO_URL,
    CLICK_ELEMENT,
    TYPE_TEXT,
    GET_PAGE_INFO,
    WAIT,
    SCROLL,
    TASK_COMPLETE,
    ASK_USER,
];

fn default_scroll_amount() -> f64 {
    500.0
}

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Towards the end of the page
    Down,
    /// Towards the top of the page
    Up,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => f.write_str("down"),
            Self::Up => f.write_str("up"),
        }
    }
}

/// A parsed tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum BrowserTool {
    /// Open a URL
    NavigateToUrl {
        /// Target URL
        url: String,
    },
    /// Click an element by description or selector
    ClickElement {
        /// Text or description of the element
        element_text: String,
        /// CSS selector, when the model knows one
        #[serde(default)]
        selector: Option<String>,
    },
    /// Type into a field by description or selector
    TypeText {
        /// Description of the field
        field_description: String,
        /// Text to type
        text: String,
        /// CSS selector, when the model knows one
        #[serde(default)]
        selector: Option<String>,
    },
    /// Summarize the current page
    GetPageInfo {},
    /// Sleep for a number of seconds
    Wait {
        /// Seconds to wait
        seconds: f64,
    },
    /// Scroll the window
    Scroll {
        /// Direction
        direction: ScrollDirection,
        /// Pixels
        #[serde(default = "default_scroll_amount")]
        amount: f64,
    },
    /// Report the final result
    TaskComplete {
        /// Result text
        result: String,
    },
    /// Ask the user a question
    AskUser {
        /// Question text
        question: String,
    },
}

impl BrowserTool {
    /// Parse a model-issued call
    pub fn parse(name: &str, arguments: &serde_json::Value) -> Result<Self> {
        if !TOOL_NAMES.contains(&name) {
            return Err(Error::NotFound(format!("tool {name}")));
        }
        let arguments = if arguments.is_object() {
            arguments.clone()
        } else {
            json!({})
        };
        serde_json::from_value(json!({ "name": name, "arguments": arguments }))
            .map_err(|e| Error::InvalidInput(format!("{name}: {e}")))
    }

    /// Tool name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NavigateToUrl { .. } => NAVIGATE_TO_URL,
            Self::ClickElement { .. } => CLICK_ELEMENT,
            Self::TypeText { .. } => TYPE_TEXT,
            Self::GetPageInfo {} => GET_PAGE_INFO,
            Self::Wait { .. } => WAIT,
            Self::Scroll { .. } => SCROLL,
            Self::TaskComplete { .. } => TASK_COMPLETE,
            Self::AskUser { .. } => ASK_USER,
        }
    }
}

/// Schemas advertised to the model on every completion call
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            NAVIGATE_TO_URL,
            "Open the given URL in the browser",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "URL to open"}
                },
                "required": ["url"]
            }),
        ),
        ToolDefinition::new(
            CLICK_ELEMENT,
            "Click an element on the page. Describe it by its visible text or purpose",
            json!({
                "type": "object",
                "properties": {
                    "element_text": {
                        "type": "string",
                        "description": "Text or description of the element, e.g. 'Sign in button', 'Jobs link'"
                    },
                    "selector": {
                        "type": "string",
                        "description": "CSS selector of the element, only if known"
                    }
                },
                "required": ["element_text"]
            }),
        ),
        ToolDefinition::new(
            TYPE_TEXT,
            "Type text into an input field",
            json!({
                "type": "object",
                "properties": {
                    "field_description": {
                        "type": "string",
                        "description": "Description of the field, e.g. 'email field', 'password field'"
                    },
                    "text": {"type": "string", "description": "Text to type"},
                    "selector": {
                        "type": "string",
                        "description": "CSS selector of the field, only if known"
                    }
                },
                "required": ["field_description", "text"]
            }),
        ),
        ToolDefinition::new(
            GET_PAGE_INFO,
            "Get a summary of the current page: links, buttons, forms and main text",
            json!({"type": "object", "properties": {}}),
        ),
        ToolDefinition::new(
            WAIT,
            "Wait for the given number of seconds",
            json!({
                "type": "object",
                "properties": {
                    "seconds": {"type": "number", "description": "Seconds to wait"}
                },
                "required": ["seconds"]
            }),
        ),
        ToolDefinition::new(
            SCROLL,
            "Scroll the page up or down",
            json!({
                "type": "object",
                "properties": {
                    "direction": {
                        "type": "string",
                        "enum": ["down", "up"],
                        "description": "Scroll direction"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Pixels to scroll (default 500)"
                    }
                },
                "required": ["direction"]
            }),
        ),
        ToolDefinition::new(
            TASK_COMPLETE,
            "Report that the task is finished and give the result",
            json!({
                "type": "object",
                "properties": {
                    "result": {"type": "string", "description": "What was accomplished or found"}
                },
                "required": ["result"]
            }),
        ),
        ToolDefinition::new(
            ASK_USER,
            "Ask the user for information the task cannot be finished without",
            json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "Question for the user"}
                },
                "required": ["question"]
            }),
        ),
    ]
}

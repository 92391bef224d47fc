//! Page summarization
//!
//! A [`PageSnapshot`] is the structured view of the current page the agent
//! receives from `get_page_info`. It is replaced on every fetch, never merged.

mod html;

use crate::browser::Browser;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub use html::{summarize_html, HtmlPageAnalyzer};

/// A heading and its level (`h1`..`h6`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Tag name, `h1` to `h6`
    pub level: String,
    /// Visible text
    pub text: String,
}

/// A hyperlink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Visible text
    pub text: String,
    /// Raw `href` attribute
    pub href: String,
    /// The link has text a user can see
    pub visible: bool,
}

/// A button-like control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// Visible text
    pub text: String,
    /// Element or input type
    #[serde(rename = "type")]
    pub kind: String,
    /// `id` attribute
    pub id: String,
    /// Space-separated classes
    pub class: String,
}

/// A form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    /// Element or input type
    #[serde(rename = "type")]
    pub kind: String,
    /// `name` attribute
    pub name: String,
    /// `id` attribute
    pub id: String,
    /// Placeholder text
    pub placeholder: String,
    /// Text of the associated `<label>`
    pub label: String,
}

/// A form and its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// Submit target
    pub action: String,
    /// HTTP method, `GET` when absent
    pub method: String,
    /// Inputs, textareas and selects
    pub inputs: Vec<FormInput>,
}

/// An element that looks clickable without being a button or link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveElement {
    /// Visible text
    pub text: String,
    /// Selector family that matched
    pub selector: String,
    /// `id` attribute
    pub id: String,
    /// Space-separated classes
    pub class: String,
}

/// Structured summary of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Page URL
    pub url: String,
    /// Document title
    pub title: String,
    /// Headings, `h1` first
    pub headings: Vec<Heading>,
    /// Links with an `href`
    pub links: Vec<Link>,
    /// Buttons, de-duplicated by text
    pub buttons: Vec<Button>,
    /// Forms on the page
    pub forms: Vec<Form>,
    /// Main text without navigation and scripts
    pub text_content: String,
    /// Other clickable-looking elements
    pub interactive_elements: Vec<InteractiveElement>,
}

impl PageSnapshot {
    /// Pretty JSON handed to the model as the tool result
    #[must_use]
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Produces page summaries from a live browser
#[async_trait::async_trait]
pub trait PageAnalyzer: Send + Sync {
    /// Summarize the current page
    async fn summarize(&self, browser: &dyn Browser) -> Result<PageSnapshot>;
}

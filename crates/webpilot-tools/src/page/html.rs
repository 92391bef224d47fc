use super::{
    Button, Form, FormInput, Heading, InteractiveElement, Link, PageAnalyzer, PageSnapshot,
};
use crate::browser::Browser;
use crate::error::Result;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

const MAX_HEADINGS: usize = 10;
const MAX_LINKS: usize = 30;
const MAX_BUTTONS: usize = 20;
const MAX_FORMS: usize = 5;
const MAX_TEXT_CHARS: usize = 500;
const MAX_INTERACTIVE: usize = 15;
const MAX_LABEL_CHARS: usize = 100;

const SKIPPED_TEXT_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "head",
];

const CLICKABLE_SELECTORS: &[&str] = &[
    "[onclick]",
    r#"[role="button"]"#,
    r#"[role="link"]"#,
    ".btn",
    ".button",
    ".clickable",
    "[data-testid]",
    "[data-qa]",
];

/// [`PageAnalyzer`] that parses the page HTML with `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPageAnalyzer;

impl HtmlPageAnalyzer {
    /// Create an analyzer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl PageAnalyzer for HtmlPageAnalyzer {
    async fn summarize(&self, browser: &dyn Browser) -> Result<PageSnapshot> {
        let url = browser.current_url().await?;
        let title = browser.title().await.unwrap_or_default();
        let html = browser.content().await?;
        debug!(url = %url, bytes = html.len(), "Summarizing page");
        Ok(summarize_html(&url, &title, &html))
    }
}

fn select_all<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| root.select(&selector).collect())
        .unwrap_or_default()
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Text with leading and trailing whitespace removed and inner runs collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn attr(element: ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).unwrap_or_default().to_string()
}

fn classes(element: ElementRef<'_>) -> String {
    element.value().classes().collect::<Vec<_>>().join(" ")
}

fn headings(root: ElementRef<'_>) -> Vec<Heading> {
    ["h1", "h2", "h3", "h4", "h5", "h6"]
        .iter()
        .flat_map(|level| {
            select_all(root, level).into_iter().filter_map(move |h| {
                let text = element_text(h);
                (!text.is_empty()).then(|| Heading {
                    level: (*level).to_string(),
                    text,
                })
            })
        })
        .take(MAX_HEADINGS)
        .collect()
}

fn links(root: ElementRef<'_>) -> Vec<Link> {
    select_all(root, "a[href]")
        .into_iter()
        .filter_map(|a| {
            let text = element_text(a);
            let href = attr(a, "href");
            (!text.is_empty() || !href.is_empty()).then(|| Link {
                visible: !text.is_empty(),
                text: clip(&text, MAX_LABEL_CHARS),
                href,
            })
        })
        .take(MAX_LINKS)
        .collect()
}

fn buttons(root: ElementRef<'_>) -> Vec<Button> {
    let mut buttons = Vec::new();
    let mut seen = HashSet::new();

    for button in select_all(
        root,
        r#"button, input[type="button"], input[type="submit"]"#,
    ) {
        let text = [element_text(button), attr(button, "value"), attr(button, "aria-label")]
            .into_iter()
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        let text = clip(&text, MAX_LABEL_CHARS);
        seen.insert(text.clone());
        buttons.push(Button {
            text,
            kind: button.value().name().to_string(),
            id: attr(button, "id"),
            class: classes(button),
        });
    }

    for button in select_all(root, r#"[role="button"]"#) {
        let text = Some(element_text(button))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| attr(button, "aria-label"));
        let text = clip(&text, MAX_LABEL_CHARS);
        if text.is_empty() || !seen.insert(text.clone()) {
            continue;
        }
        buttons.push(Button {
            text,
            kind: format!("{} with role=button", button.value().name()),
            id: attr(button, "id"),
            class: classes(button),
        });
    }

    buttons.truncate(MAX_BUTTONS);
    buttons
}

fn input_label(form: ElementRef<'_>, input: ElementRef<'_>) -> String {
    if let Some(id) = input.value().attr("id").filter(|id| !id.is_empty()) {
        if let Some(label) = select_all(form, "label")
            .into_iter()
            .find(|label| label.value().attr("for") == Some(id))
        {
            return element_text(label);
        }
    }
    input
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "label")
        .map(element_text)
        .unwrap_or_default()
}

fn forms(root: ElementRef<'_>) -> Vec<Form> {
    select_all(root, "form")
        .into_iter()
        .take(MAX_FORMS)
        .map(|form| Form {
            action: attr(form, "action"),
            method: form
                .value()
                .attr("method")
                .unwrap_or("GET")
                .to_string(),
            inputs: select_all(form, "input, textarea, select")
                .into_iter()
                .map(|input| FormInput {
                    kind: input
                        .value()
                        .attr("type")
                        .unwrap_or_else(|| input.value().name())
                        .to_string(),
                    name: attr(input, "name"),
                    id: attr(input, "id"),
                    placeholder: attr(input, "placeholder"),
                    label: input_label(form, input),
                })
                .collect(),
        })
        .collect()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_TEXT_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push(' ');
            out.push_str(text);
        }
    }
}

fn main_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(root, &mut raw);
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    clip(&collapsed, MAX_TEXT_CHARS)
}

fn interactive_elements(root: ElementRef<'_>) -> Vec<InteractiveElement> {
    CLICKABLE_SELECTORS
        .iter()
        .flat_map(|selector| {
            select_all(root, selector).into_iter().filter_map(move |element| {
                let text = Some(element_text(element))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| attr(element, "aria-label"));
                (!text.is_empty()).then(|| InteractiveElement {
                    text: clip(&text, MAX_LABEL_CHARS),
                    selector: (*selector).to_string(),
                    id: attr(element, "id"),
                    class: classes(element),
                })
            })
        })
        .take(MAX_INTERACTIVE)
        .collect()
}

/// Build a [`PageSnapshot`] from raw HTML
#[must_use]
pub fn summarize_html(url: &str, title: &str, html: &str) -> PageSnapshot {
    let document = Html::parse_document(html);
    let root = document.root_element();

    PageSnapshot {
        url: url.to_string(),
        title: title.to_string(),
        headings: headings(root),
        links: links(root),
        buttons: buttons(root),
        forms: forms(root),
        text_content: main_text(root),
        interactive_elements: interactive_elements(root),
    }
}

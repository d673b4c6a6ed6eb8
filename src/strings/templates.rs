//! # Templates
//!
//! Exposes the HTML templates from the `templates/` directory and a tiny
//! `{{name}}` substitution helper for them.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));

pub const LAYOUT: &str = include_str!("../../templates/layout.html");
pub const INDEX: &str = include_str!("../../templates/index.html");
pub const EXTRACT: &str = include_str!("../../templates/extract.html");
pub const QUIZ: &str = include_str!("../../templates/quiz.html");

/// Replaces every `{{key}}` in one pass, so inserted values are never expanded.
/// Values are inserted as-is; escape them first. Unknown keys are left in place.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            vars.iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Wraps a page body in the shared layout.
pub fn page(title: &str, body: &str) -> String {
    render(LAYOUT, &[("title", &escape_html(title)), ("body", body)])
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

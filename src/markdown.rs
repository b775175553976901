//! Lightweight markdown-to-HTML conversion for assistant messages.
//!
//! This is a fixed sequence of regex substitutions, not a markdown grammar.
//! Nested lists, links and escaping are not supported, and unbalanced input
//! can come out as unbalanced HTML.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Marker carried by placeholder content while an operation is in flight.
pub const LOADING_MARKER: &str = r#"<div class="loading">"#;

static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^### (.+)$").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^## (.+)$").unwrap());
static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_+-]*\n)?(.*?)```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^- (.+)$").unwrap());
static LIST_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^<li>.*</li>(?:\n<li>.*</li>)*").unwrap());

static WARNING_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:•|- )\s*(.+)$").unwrap());

/// Returns true when `content` is placeholder markup rather than a final answer.
pub fn is_loading(content: &str) -> bool {
    content.contains(LOADING_MARKER)
}

/// Convert the supported markdown subset to an HTML fragment.
///
/// Rules run once each, in order: headings, bold, fenced code, inline code,
/// list items (each contiguous run wrapped in `<ul>`), blank lines, single
/// newlines, horizontal rules. Placeholder markup is passed through untouched.
pub fn convert_markdown_to_html(text: &str) -> String {
    if is_loading(text) {
        return text.to_string();
    }

    let html = H3.replace_all(text, "<h3>${1}</h3>");
    let html = H2.replace_all(&html, "<h2>${1}</h2>");
    let html = H1.replace_all(&html, "<h1>${1}</h1>");
    let html = BOLD.replace_all(&html, "<strong>${1}</strong>");
    let html = FENCED_CODE.replace_all(&html, "<pre><code>${1}</code></pre>");
    let html = INLINE_CODE.replace_all(&html, "<code>${1}</code>");
    let html = LIST_ITEM.replace_all(&html, "<li>${1}</li>");
    let html = LIST_RUN.replace_all(&html, |caps: &Captures| {
        format!("<ul>{}</ul>", caps[0].replace('\n', ""))
    });
    let html = html.replace("\n\n", "<br><br>").replace('\n', "<br>");
    html.split("<br>")
        .map(|line| if line == "---" { "<hr>" } else { line })
        .collect::<Vec<_>>()
        .join("<br>")
}

/// Format the server's drug-interaction report for the warning dialog.
///
/// Only bold spans, bullet lines and newlines are handled. Headings and code
/// are left as literal text here even though the chat converter handles them.
pub fn format_interaction_details(text: &str) -> String {
    let html = BOLD.replace_all(text, "<strong>${1}</strong>");
    let html = WARNING_BULLET.replace_all(&html, r#"<span class="bullet">• ${1}</span>"#);
    html.replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold() {
        let html = convert_markdown_to_html("**bold**");
        assert_eq!(html, "<strong>bold</strong>");
        assert!(!html.contains('*'));
    }

    #[test]
    fn test_list_wrapped_in_order() {
        let html = convert_markdown_to_html("- a\n- b");
        assert_eq!(html, "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_separate_lists_get_separate_containers() {
        let html = convert_markdown_to_html("- a\n\ntext\n- b");
        assert_eq!(html.matches("<ul>").count(), 2);
        assert!(html.find("<li>a</li>").unwrap() < html.find("<li>b</li>").unwrap());
    }

    #[test]
    fn test_headings() {
        let html = convert_markdown_to_html("# One\n## Two\n### Three");
        assert_eq!(html, "<h1>One</h1><br><h2>Two</h2><br><h3>Three</h3>");
    }

    #[test]
    fn test_heading_marker_needs_line_start() {
        let html = convert_markdown_to_html("issue # 4");
        assert_eq!(html, "issue # 4");
    }

    #[test]
    fn test_paragraph_and_line_breaks() {
        let html = convert_markdown_to_html("one\ntwo\n\nthree");
        assert_eq!(html, "one<br>two<br><br>three");
    }

    #[test]
    fn test_inline_code() {
        let html = convert_markdown_to_html("take `2x` daily");
        assert_eq!(html, "take <code>2x</code> daily");
    }

    #[test]
    fn test_fenced_code() {
        let html = convert_markdown_to_html("```\nlet x = 1;\n```");
        assert!(html.starts_with("<pre><code>let x = 1;"));
        assert!(html.ends_with("</code></pre>"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_horizontal_rule() {
        let html = convert_markdown_to_html("above\n---\nbelow");
        assert_eq!(html, "above<br><hr><br>below");
        assert_eq!(convert_markdown_to_html("---"), "<hr>");
        assert_eq!(convert_markdown_to_html("a --- b"), "a --- b");
    }

    #[test]
    fn test_consecutive_rules() {
        let html = convert_markdown_to_html("a\n---\n---\nb");
        assert_eq!(html, "a<br><hr><br><hr><br>b");
        assert_eq!(html.matches("<hr>").count(), 2);
    }

    #[test]
    fn test_loading_marker_passes_through() {
        let placeholder = r#"<div class="loading"><div class="spinner"></div></div>"#;
        assert_eq!(convert_markdown_to_html(placeholder), placeholder);

        let odd = "**x**\n<div class=\"loading\">";
        assert_eq!(convert_markdown_to_html(odd), odd);
        assert_eq!(convert_markdown_to_html(&convert_markdown_to_html(odd)), odd);
    }

    #[test]
    fn test_unclosed_bold_is_left_alone() {
        assert_eq!(convert_markdown_to_html("**open"), "**open");
    }

    #[test]
    fn test_interaction_details() {
        let html = format_interaction_details("**Warning**\n• risk");
        assert_eq!(
            html,
            r#"<strong>Warning</strong><br><span class="bullet">• risk</span>"#
        );
    }

    #[test]
    fn test_interaction_details_skip_headings() {
        let html = format_interaction_details("# Title\n- item");
        assert!(html.starts_with("# Title<br>"));
        assert!(html.contains(r#"<span class="bullet">• item</span>"#));
        assert!(!html.contains("<h1>"));
    }
}

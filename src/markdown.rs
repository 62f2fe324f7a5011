//! Markdown bridge.
//!
//! Markdown is parsed with a CommonMark block parser. Export in the other
//! direction is deliberately lossy: a tree is written out as its plain text.

use pulldown_cmark::{html, Event, Options, Parser};

use crate::model::DocumentTree;
use crate::sanitize::sanitize;

/// Convert Markdown to sanitized HTML.
///
/// Supports headings, emphasis, strikethrough, blockquotes, fenced and
/// inline code, lists, links, images and tables. A single newline inside a
/// paragraph becomes a `<br>`.
///
/// # Example
///
/// ```
/// let html = docport::markdown::markdown_to_html("# Title");
/// assert_eq!(html.trim(), "<h1>Title</h1>");
/// ```
pub fn markdown_to_html(text: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    sanitize(&out)
}

/// Convert a tree to Markdown.
///
/// Only the text survives; formatting is dropped.
pub fn tree_to_markdown(tree: &DocumentTree) -> String {
    tree.plain_text()
}

/// Convert an HTML fragment to Markdown (text only).
pub fn html_to_markdown(html: &str) -> String {
    tree_to_markdown(&DocumentTree::from_html(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(html: &str) -> Vec<String> {
        let tree = DocumentTree::from_html(html);
        tree.nodes
            .iter()
            .filter_map(|n| n.as_element())
            .filter(|e| e.tag.starts_with('h') && e.tag.len() == 2)
            .map(|e| e.tag.clone())
            .collect()
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(headings(&markdown_to_html("# Title")), vec!["h1"]);
        assert_eq!(headings(&markdown_to_html("###### Title")), vec!["h6"]);
    }

    #[test]
    fn test_seven_hashes_is_paragraph() {
        let html = markdown_to_html("####### Title");
        assert!(headings(&html).is_empty());
        assert!(html.contains("<p>####### Title</p>"));
    }

    #[test]
    fn test_inline_formatting() {
        let html = markdown_to_html("**bold** *it* ~~gone~~ `code`");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>it</em>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("<code>code</code>"));
    }

    #[test]
    fn test_lists_share_wrapper() {
        let html = markdown_to_html("- a\n- b\n\n1. x\n2. y\n");
        assert_eq!(html.matches("<ul>").count(), 1);
        assert_eq!(html.matches("<ol>").count(), 1);
        assert_eq!(html.matches("<li>").count(), 4);
    }

    #[test]
    fn test_soft_break_becomes_br() {
        let html = markdown_to_html("one\ntwo");
        assert!(html.contains("one<br>"));
    }

    #[test]
    fn test_links_and_images() {
        let html = markdown_to_html("[site](https://example.com) ![alt](a.png)");
        assert!(html.contains("<a href=\"https://example.com\">site</a>"));
        assert!(html.contains("<img "));
        assert!(html.contains("src=\"a.png\""));
        assert!(html.contains("alt=\"alt\""));
    }

    #[test]
    fn test_output_is_sanitized() {
        let html = markdown_to_html("<script>alert(1)</script>\n\n[x](javascript:alert(1))");
        assert!(!html.contains("<script"));
        assert!(!html.to_lowercase().contains("javascript:"));
    }

    #[test]
    fn test_html_to_markdown_is_text() {
        assert_eq!(
            html_to_markdown("<h1>Title</h1><p><b>bold</b> text</p>"),
            "Title\nbold text"
        );
    }
}

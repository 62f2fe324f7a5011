//! Denylist-based cleaning of untrusted HTML.
//!
//! Elements that can run code or embed foreign content are removed along with
//! their subtree. Event-handler attributes and `javascript:` links are
//! stripped from everything that survives. This is a best-effort filter, not
//! a full allowlist policy.

use log::debug;

use crate::model::{DocumentTree, Element, Node};

/// Tags removed together with their content.
pub const DENIED_TAGS: &[&str] = &["script", "iframe", "object", "embed"];

/// What a sanitizer pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Number of denied elements removed (subtrees count once)
    pub removed_elements: usize,
    /// Number of attributes removed from surviving elements
    pub removed_attributes: usize,
}

impl SanitizeReport {
    /// Check whether the pass changed anything.
    pub fn is_clean(&self) -> bool {
        self.removed_elements == 0 && self.removed_attributes == 0
    }
}

/// Sanitize an HTML fragment and return the cleaned markup.
///
/// Idempotent: sanitizing the output again yields the same string.
///
/// # Example
///
/// ```
/// let clean = docport::sanitize::sanitize("<script>alert(1)</script><p onclick=\"x()\">hi</p>");
/// assert_eq!(clean, "<p>hi</p>");
/// ```
pub fn sanitize(html: &str) -> String {
    let mut tree = DocumentTree::from_html(html);
    sanitize_tree(&mut tree);
    tree.to_html()
}

/// Sanitize a tree in place and report what was removed.
pub fn sanitize_tree(tree: &mut DocumentTree) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    clean_children(&mut tree.nodes, &mut report);
    if !report.is_clean() {
        debug!(
            "sanitizer removed {} element(s) and {} attribute(s)",
            report.removed_elements, report.removed_attributes
        );
    }
    report
}

fn clean_children(nodes: &mut Vec<Node>, report: &mut SanitizeReport) {
    nodes.retain(|node| match node {
        Node::Element(el) if is_denied(&el.tag) => {
            report.removed_elements += 1;
            false
        }
        _ => true,
    });
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            clean_element(el, report);
        }
    }
}

fn clean_element(el: &mut Element, report: &mut SanitizeReport) {
    let before = el.attrs.len();
    el.attrs.retain(|(name, value)| !is_unsafe_attribute(name, value));
    report.removed_attributes += before - el.attrs.len();
    clean_children(&mut el.children, report);
}

fn is_denied(tag: &str) -> bool {
    DENIED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn is_unsafe_attribute(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") {
        return true;
    }
    name == "href" && is_script_url(value)
}

/// Check whether a URL uses the `javascript:` scheme.
pub fn is_script_url(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed
        .get(..11)
        .map(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_denied_elements() {
        assert_eq!(sanitize("<script>alert(1)</script><p>hi</p>"), "<p>hi</p>");
        assert_eq!(
            sanitize("<div><iframe src=\"x\"></iframe><object></object>ok</div>"),
            "<div>ok</div>"
        );
    }

    #[test]
    fn test_removes_event_handlers() {
        assert_eq!(
            sanitize("<img src=\"a.png\" onerror=\"x()\">"),
            "<img src=\"a.png\">"
        );
        assert_eq!(sanitize("<p ONCLICK=\"x()\">a</p>"), "<p>a</p>");
    }

    #[test]
    fn test_removes_script_links() {
        assert_eq!(
            sanitize("<a href=\"  JavaScript:alert(1)\">x</a>"),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize("<a href=\"https://example.com\">x</a>"),
            "<a href=\"https://example.com\">x</a>"
        );
    }

    #[test]
    fn test_raw_text_elements_idempotent() {
        for html in [
            "<noscript>a&b</noscript>",
            "<noscript><p>x</p></noscript>",
            "<plaintext>a&b",
            "<textarea>x &amp; y</textarea>",
            "<p><style>a & b</style><title>t&amp;</title></p>",
        ] {
            let once = sanitize(html);
            assert_eq!(sanitize(&once), once, "{}", html);
        }
    }

    #[test]
    fn test_report_counts() {
        let mut tree =
            DocumentTree::from_html("<p onclick=\"a\" onmouseover=\"b\">x<script>y</script></p>");
        let report = sanitize_tree(&mut tree);
        assert_eq!(report.removed_elements, 1);
        assert_eq!(report.removed_attributes, 2);
        assert!(sanitize_tree(&mut tree).is_clean());
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize("<p>a<embed src=x>b<a href='javascript:1' onclick=x>c</a></p>");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn test_is_script_url() {
        assert!(is_script_url("javascript:void(0)"));
        assert!(is_script_url(" \tJAVASCRIPT:x"));
        assert!(!is_script_url("java"));
        assert!(!is_script_url("https://javascript:"));
    }
}

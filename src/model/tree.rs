//! The document tree: an ordered, owned tree of text and element nodes.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are serialized without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "noscript",
    "plaintext",
];

/// Elements whose first newline is dropped by the parser.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

/// Elements that start a new line in rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "dl",
    "dt",
    "dd",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "tr",
    "ul",
];

/// Elements that carry visible content even when they have no text.
const CONTENT_ELEMENTS: &[&str] = &["img", "hr", "table", "iframe", "object", "embed"];

/// Check whether a tag renders as a block.
pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// A document: the ordered top-level nodes of a fragment.
///
/// The tree is a plain value. Importers build a new one and the owner swaps
/// it in; nothing edits a tree in place during import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    /// Top-level nodes in document order
    pub nodes: Vec<Node>,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Character data
    Text(String),
    /// A tagged element with attributes and children
    Element(Element),
}

/// An element node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    /// Child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl DocumentTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree from top-level nodes.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Parse an HTML fragment into a tree.
    ///
    /// Parsing follows the HTML5 fragment algorithm, so malformed markup is
    /// repaired rather than rejected. Comments and doctypes are dropped.
    pub fn from_html(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        Self {
            nodes: convert_children(fragment.root_element()),
        }
    }

    /// Serialize the tree back to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(node, false, &mut out);
        }
        out
    }

    /// Rendered text of the tree.
    ///
    /// Block elements are separated by a newline and `<br>` becomes a
    /// newline; runs of whitespace inside text collapse to one space except
    /// under `<pre>`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            collect_text(node, false, &mut out);
        }
        out.trim_end_matches(['\n', ' ']).to_string()
    }

    /// Check whether the tree has no visible content.
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(Node::is_blank)
    }

    /// Total number of element nodes at any depth.
    pub fn element_count(&self) -> usize {
        self.nodes.iter().map(Node::element_count).sum()
    }

    /// Append a top-level node.
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

impl Node {
    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// Borrow the element if this is an element node.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of this node and its descendants, without layout.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.clone(),
            Node::Element(el) => el.text_content(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Node::Text(t) => t.trim().is_empty(),
            Node::Element(el) => {
                !CONTENT_ELEMENTS.contains(&el.tag.as_str()) && el.children.iter().all(Node::is_blank)
            }
        }
    }

    fn element_count(&self) -> usize {
        match self {
            Node::Text(_) => 0,
            Node::Element(el) => 1 + el.children.iter().map(Node::element_count).sum::<usize>(),
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Add a child node (builder style).
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Add a text child (builder style).
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    /// Look up an attribute value by name (case-insensitive).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Concatenated descendant text.
    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    /// Child elements, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Check whether this is a void element.
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }
}

impl From<Node> for DocumentTree {
    fn from(node: Node) -> Self {
        Self { nodes: vec![node] }
    }
}

impl From<Element> for DocumentTree {
    fn from(el: Element) -> Self {
        Self {
            nodes: vec![Node::Element(el)],
        }
    }
}

fn convert_children(parent: ElementRef<'_>) -> Vec<Node> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        match child.value() {
            scraper::Node::Text(t) => {
                let text: &str = t;
                nodes.push(Node::Text(text.to_string()));
            }
            scraper::Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    nodes.push(Node::Element(convert_element(el)));
                }
            }
            _ => {}
        }
    }
    nodes
}

fn convert_element(el: ElementRef<'_>) -> Element {
    let value = el.value();
    Element {
        tag: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        children: convert_children(el),
    }
}

/// Escape text for inclusion in HTML content or attribute values.
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

fn write_node(node: &Node, raw: bool, out: &mut String) {
    match node {
        Node::Text(t) if raw => out.push_str(t),
        Node::Text(t) => out.push_str(&escape_html(t)),
        Node::Element(el) if el.tag == "plaintext" => {
            // No end tag exists, so the text is kept as a pre block instead
            let pre = Element {
                tag: "pre".to_string(),
                attrs: el.attrs.clone(),
                children: vec![Node::Text(el.text_content())],
            };
            write_node(&Node::Element(pre), false, out);
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(value));
                out.push('"');
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            let leading_newline =
                matches!(el.children.first(), Some(Node::Text(t)) if t.starts_with('\n'));
            if leading_newline && LEADING_NEWLINE_ELEMENTS.contains(&el.tag.as_str()) {
                out.push('\n');
            }
            let raw_children = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
            for child in &el.children {
                write_node(child, raw_children, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn ensure_line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn collect_text(node: &Node, preformatted: bool, out: &mut String) {
    match node {
        Node::Text(t) if preformatted => out.push_str(t),
        Node::Text(t) => {
            let collapsed = t.split_whitespace().collect::<Vec<_>>().join(" ");
            let starts_ws = t.starts_with(char::is_whitespace);
            let ends_ws = t.ends_with(char::is_whitespace);
            let at_line_start = out.is_empty() || out.ends_with('\n');
            if collapsed.is_empty() {
                if !at_line_start && !out.ends_with(' ') && !t.is_empty() {
                    out.push(' ');
                }
                return;
            }
            if starts_ws && !at_line_start && !out.ends_with(' ') {
                out.push(' ');
            }
            out.push_str(&collapsed);
            if ends_ws {
                out.push(' ');
            }
        }
        Node::Element(el) => match el.tag.as_str() {
            "br" => {
                trim_trailing_space(out);
                out.push('\n');
            }
            "script" | "style" => {}
            "td" | "th" => {
                if !out.is_empty() && !out.ends_with('\n') {
                    trim_trailing_space(out);
                    out.push('\t');
                }
                for child in &el.children {
                    collect_text(child, preformatted, out);
                }
            }
            tag if is_block_tag(tag) => {
                trim_trailing_space(out);
                ensure_line_break(out);
                let pre = preformatted || tag == "pre";
                for child in &el.children {
                    collect_text(child, pre, out);
                }
                trim_trailing_space(out);
                ensure_line_break(out);
            }
            _ => {
                for child in &el.children {
                    collect_text(child, preformatted, out);
                }
            }
        },
    }
}

fn trim_trailing_space(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_html_structure() {
        let tree = DocumentTree::from_html("<p>Hello <b>world</b></p>");
        assert_eq!(tree.nodes.len(), 1);
        let p = tree.nodes[0].as_element().unwrap();
        assert_eq!(p.tag, "p");
        assert_eq!(p.children.len(), 2);
        assert_eq!(p.children[0], Node::text("Hello "));
        assert_eq!(p.child_elements().next().unwrap().tag, "b");
    }

    #[test]
    fn test_to_html_round_trip() {
        let html = "<p class=\"x\">a &amp; b<br>c</p><ul><li>one</li></ul>";
        let tree = DocumentTree::from_html(html);
        assert_eq!(tree.to_html(), html);
    }

    #[test]
    fn test_to_html_escapes_attributes() {
        let el = Element::new("a")
            .with_attr("href", "http://x/?a=1&b=\"2\"")
            .with_text("<link>");
        let tree = DocumentTree::from(el);
        assert_eq!(
            tree.to_html(),
            "<a href=\"http://x/?a=1&amp;b=&quot;2&quot;\">&lt;link&gt;</a>"
        );
    }

    #[test]
    fn test_raw_text_round_trips_unescaped() {
        let html = "<noscript>a&b <p>x</p></noscript>";
        let once = DocumentTree::from_html(html).to_html();
        assert_eq!(once, html);
        assert_eq!(DocumentTree::from_html(&once).to_html(), once);
    }

    #[test]
    fn test_plaintext_written_as_pre() {
        let once = DocumentTree::from_html("<plaintext>a&b <i>c").to_html();
        assert_eq!(once, "<pre>a&amp;b &lt;i&gt;c</pre>");
        assert_eq!(DocumentTree::from_html(&once).to_html(), once);
    }

    #[test]
    fn test_pre_keeps_leading_newline() {
        let tree = DocumentTree::from_html("<pre>\n\nx</pre>");
        let once = tree.to_html();
        assert_eq!(DocumentTree::from_html(&once), tree);
    }

    #[test]
    fn test_plain_text_blocks_and_breaks() {
        let tree = DocumentTree::from_html("<h1>Title</h1><p>One</p><p>Two<br>Three</p>");
        assert_eq!(tree.plain_text(), "Title\nOne\nTwo\nThree");

        let tree = DocumentTree::from_html("Line1<br>Line2");
        assert_eq!(tree.plain_text(), "Line1\nLine2");
    }

    #[test]
    fn test_plain_text_collapses_markup_whitespace() {
        let tree = DocumentTree::from_html("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");
        assert_eq!(tree.plain_text(), "a\nb");
    }

    #[test]
    fn test_plain_text_preserves_pre() {
        let tree = DocumentTree::from_html("<pre>x  =  1\ny</pre>");
        assert_eq!(tree.plain_text(), "x  =  1\ny");
    }

    #[test]
    fn test_is_empty_and_counts() {
        assert!(DocumentTree::new().is_empty());
        assert!(DocumentTree::from_html("<p>  </p>").is_empty());
        assert!(!DocumentTree::from_html("<img src=\"a.png\">").is_empty());

        let tree = DocumentTree::from_html("<div><p>a</p><p>b</p></div>");
        assert_eq!(tree.element_count(), 3);
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut el = Element::new("P").with_attr("style", "a");
        el.set_attr("STYLE", "b");
        assert_eq!(el.tag, "p");
        assert_eq!(el.attrs.len(), 1);
        assert_eq!(el.attr("style"), Some("b"));
    }

    #[test]
    fn test_serde_shape() {
        let tree = DocumentTree::from_html("<p>hi</p>");
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"{"nodes":[{"element":{"tag":"p","children":[{"text":"hi"}]}}]}"#
        );
        let back: DocumentTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}

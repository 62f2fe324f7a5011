//! Text-flattened export labelled as a word-processing document.
//!
//! The payload is plain UTF-8 text with list markers, not a valid office
//! container. Consumers that need a real package should use the RTF export.

use crate::model::{is_block_tag, DocumentTree, Node};

/// MIME type attached to the flattened payload.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Bullet marker for unordered list items.
const BULLET: &str = "\u{2022} ";

/// Flatten a tree into one line per block.
///
/// Ordered list items are numbered `N. `, unordered items get a bullet, and
/// every block ends with a newline. Returns an empty string when the tree
/// has no text.
pub fn flatten_text(tree: &DocumentTree) -> String {
    let mut flattener = Flattener::default();
    flattener.walk(&tree.nodes, None);
    flattener.flush();

    let mut out = String::new();
    for line in flattener.lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[derive(Default)]
struct Flattener {
    lines: Vec<String>,
    current: String,
}

impl Flattener {
    fn walk(&mut self, nodes: &[Node], parent: Option<&str>) {
        let mut ordinal = 0;
        for node in nodes {
            match node {
                Node::Text(text) => self.push_text(text),
                Node::Element(el) if el.tag == "br" => self.flush(),
                Node::Element(el) if matches!(el.tag.as_str(), "script" | "style") => {}
                Node::Element(el) if is_block_tag(&el.tag) || el.tag == "td" || el.tag == "th" => {
                    self.flush();
                    if el.tag == "li" {
                        ordinal += 1;
                        if parent == Some("ol") {
                            self.current.push_str(&format!("{}. ", ordinal));
                        } else {
                            self.current.push_str(BULLET);
                        }
                    }
                    self.walk(&el.children, Some(&el.tag));
                    self.flush();
                }
                Node::Element(el) => self.walk(&el.children, Some(&el.tag)),
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            if !text.is_empty() && !self.current.is_empty() && !self.current.ends_with(' ') {
                self.current.push(' ');
            }
            return;
        }
        if text.starts_with(char::is_whitespace)
            && !self.current.is_empty()
            && !self.current.ends_with(' ')
        {
            self.current.push(' ');
        }
        let joined = words.collect::<Vec<_>>().join(" ");
        self.current.push_str(&joined);
        if text.ends_with(char::is_whitespace) {
            self.current.push(' ');
        }
    }

    fn flush(&mut self) {
        let line = self.current.trim().to_string();
        self.current.clear();
        if !line.is_empty() && line != BULLET.trim() && !is_bare_number(&line) {
            self.lines.push(line);
        }
    }
}

/// A list marker with no item text, such as `3.`.
fn is_bare_number(line: &str) -> bool {
    line.strip_suffix('.')
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

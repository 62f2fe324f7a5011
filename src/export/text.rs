//! Plain text export.

use crate::model::DocumentTree;

/// Convert a tree to plain text with CRLF line endings.
pub fn to_text(tree: &DocumentTree) -> String {
    tree.plain_text().replace('\n', "\r\n")
}

//! Markdown export.

use crate::markdown::tree_to_markdown;
use crate::model::DocumentTree;

/// Convert a tree to Markdown.
///
/// Formatting is not carried over; the output is the document's text.
pub fn to_markdown(tree: &DocumentTree) -> String {
    tree_to_markdown(tree)
}

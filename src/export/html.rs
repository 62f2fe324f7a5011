//! Standalone HTML document export.

use crate::model::{escape_html, DocumentTree};

/// Wrap a tree in a complete HTML document.
pub fn to_html_document(tree: &DocumentTree, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        tree.to_html()
    )
}

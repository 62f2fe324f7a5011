//! JSON export of the document tree.

use crate::error::{Error, Result};
use crate::model::DocumentTree;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert a tree to JSON.
pub fn to_json(tree: &DocumentTree, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(tree),
        JsonFormat::Compact => serde_json::to_string(tree),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_pretty() {
        let tree = DocumentTree::from_html("<p>Test</p>");
        let json = to_json(&tree, JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"tag\": \"p\""));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let tree = DocumentTree::from_html("<p>Test</p>");
        let json = to_json(&tree, JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        let back: DocumentTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}

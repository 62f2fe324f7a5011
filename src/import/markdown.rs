//! Markdown importer.

use super::{Extracted, FormatImporter, ImportOptions, Strategy};
use crate::error::Result;
use crate::markdown::markdown_to_html;

/// Markdown importer backed by the markdown bridge.
#[derive(Debug, Clone, Default)]
pub struct MarkdownImporter {
    _private: (),
}

impl MarkdownImporter {
    /// Create a new Markdown importer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatImporter for MarkdownImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn name(&self) -> &str {
        "markdown"
    }

    fn import(&self, _extension: &str, data: &[u8], _options: &ImportOptions) -> Result<Extracted> {
        let text = String::from_utf8_lossy(data);
        Ok(Extracted::new(markdown_to_html(&text), Strategy::Markdown))
    }
}

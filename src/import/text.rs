//! Plain text importer.

use super::{Extracted, FormatImporter, ImportOptions, Strategy};
use crate::error::Result;
use crate::model::escape_html;

/// Convert plain text to markup: entities escaped, each line break a `<br>`.
pub fn text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    escape_html(&normalized).replace('\n', "<br>")
}

/// Plain text importer.
#[derive(Debug, Clone, Default)]
pub struct TextImporter {
    _private: (),
}

impl TextImporter {
    /// Create a new text importer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatImporter for TextImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text"]
    }

    fn name(&self) -> &str {
        "text"
    }

    fn import(&self, _extension: &str, data: &[u8], _options: &ImportOptions) -> Result<Extracted> {
        let text = String::from_utf8_lossy(data);
        Ok(Extracted::new(text_to_html(&text), Strategy::PlainText))
    }
}

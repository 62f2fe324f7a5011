//! HTML importer.

use super::{Extracted, FormatImporter, ImportOptions, Strategy};
use crate::error::Result;
use crate::sanitize::sanitize;

/// HTML importer; the markup is only sanitized.
#[derive(Debug, Clone, Default)]
pub struct HtmlImporter {
    _private: (),
}

impl HtmlImporter {
    /// Create a new HTML importer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatImporter for HtmlImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    fn name(&self) -> &str {
        "html"
    }

    fn import(&self, _extension: &str, data: &[u8], _options: &ImportOptions) -> Result<Extracted> {
        let markup = String::from_utf8_lossy(data);
        Ok(Extracted::new(sanitize(&markup), Strategy::Html))
    }
}

//! Export options and configuration.

use serde::Serialize;

/// Title used when none is given.
pub const DEFAULT_TITLE: &str = "Exported Note";

/// File stem used when none is given.
pub const DEFAULT_FILE_STEM: &str = "note";

/// Options for exporting documents.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Document title (HTML `<title>` and the PDF header)
    pub title: String,

    /// File name without extension
    pub file_stem: String,

    /// Page layout handed to the PDF renderer
    pub page_setup: PageSetup,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the file stem.
    pub fn with_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.file_stem = stem.into();
        self
    }

    /// Set the page layout.
    pub fn with_page_setup(mut self, setup: PageSetup) -> Self {
        self.page_setup = setup;
        self
    }

    /// File name for the given extension.
    pub fn filename(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem, extension)
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            file_stem: DEFAULT_FILE_STEM.to_string(),
            page_setup: PageSetup::default(),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Taller than wide
    #[default]
    Portrait,
    /// Wider than tall
    Landscape,
}

/// Page layout for PDF rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSetup {
    /// Vertical and horizontal margins in millimetres
    pub margins_mm: [f32; 2],
    /// Paper format name
    pub format: String,
    /// Page orientation
    pub orientation: Orientation,
    /// Rasterization scale
    pub scale: f32,
    /// Image quality (0.0 - 1.0)
    pub image_quality: f32,
}

impl PageSetup {
    /// Set the paper format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the margins in millimetres.
    pub fn with_margins(mut self, vertical: f32, horizontal: f32) -> Self {
        self.margins_mm = [vertical, horizontal];
        self
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            margins_mm: [15.0, 15.0],
            format: "a4".to_string(),
            orientation: Orientation::Portrait,
            scale: 2.0,
            image_quality: 0.98,
        }
    }
}

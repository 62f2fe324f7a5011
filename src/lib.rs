//! # docport
//!
//! Document interchange engine for rich-text notes.
//!
//! This library moves a document tree in and out of external formats:
//! plain text, HTML, Markdown and RTF in both directions, best-effort text
//! recovery from DOCX-class and PDF binaries, and text-flattened DOCX or
//! renderer-backed PDF on export. Untrusted HTML is sanitized before it
//! becomes a tree.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docport::{export, import_file, ExportFormat};
//!
//! fn main() -> docport::Result<()> {
//!     // Import any supported file
//!     let outcome = import_file("notes.rtf")?;
//!     println!("imported with {}", outcome.strategy);
//!
//!     // Export the tree as Markdown
//!     let payload = export(&outcome.tree, ExportFormat::Markdown)?;
//!     std::fs::write(&payload.filename, &payload.bytes)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Never-empty import**: every binary extractor degrades to a generic
//!   printable-run scanner instead of failing
//! - **Tiered PDF recovery**: structure markers, whitespace split, text objects
//! - **Styled RTF output**: resolved styles, lists, links and tables
//! - **Sanitized markup**: scripts, embeds and event handlers are removed
//! - **Stale-result protection**: generation tickets for deferred imports

pub mod detect;
pub mod error;
pub mod export;
pub mod import;
pub mod markdown;
pub mod model;
pub mod notify;
pub mod sanitize;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, sniff_file, Format};
pub use error::{Error, Result};
pub use export::{
    encode_rtf, DirectoryDownloader, Downloader, ExportFormat, ExportOptions, ExportPayload,
    Exporter, JsonFormat, PageRenderer, PageSetup, PdfRenderJob,
};
pub use import::{
    ErrorMode, FormatImporter, ImportDispatcher, ImportOptions, ImportOutcome, ImportSource,
    ImportState, ImporterRegistry, Strategy, Workspace,
};
pub use markdown::markdown_to_html;
pub use model::{Alignment, Block, BlockKind, DocumentTree, Element, Node, StyleContext};
pub use notify::{LogNotifier, Notifier, NullNotifier, Severity};
pub use sanitize::sanitize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

/// Import a file from disk with default options.
///
/// # Example
///
/// ```no_run
/// use docport::import_file;
///
/// let outcome = import_file("report.pdf").unwrap();
/// println!("{}", outcome.html);
/// ```
pub fn import_file<P: AsRef<Path>>(path: P) -> Result<ImportOutcome> {
    ImportDispatcher::new().import_path(path)
}

/// Import bytes already in memory. `name` selects the importer by extension.
///
/// # Example
///
/// ```
/// let outcome = docport::import_bytes("note.md", b"# Title").unwrap();
/// assert_eq!(outcome.tree.plain_text(), "Title");
/// ```
pub fn import_bytes(name: &str, data: &[u8]) -> Result<ImportOutcome> {
    ImportDispatcher::new().import(&ImportSource::from_bytes(name, data))
}

/// Export a tree with default options.
///
/// PDF export needs a page renderer; use [`Docport::with_renderer`].
pub fn export(tree: &DocumentTree, format: ExportFormat) -> Result<ExportPayload> {
    Exporter::new().export(tree, format)
}

/// Builder for importing and exporting documents.
///
/// # Example
///
/// ```no_run
/// use docport::{Docport, ExportFormat};
///
/// let payload = Docport::new()
///     .strict()
///     .with_title("Meeting notes")
///     .convert("notes.docx", ExportFormat::Rtf)?;
/// # Ok::<(), docport::Error>(())
/// ```
#[derive(Clone)]
pub struct Docport {
    import_options: ImportOptions,
    export_options: ExportOptions,
    renderer: Option<Arc<dyn PageRenderer>>,
    notifier: Arc<dyn Notifier>,
}

impl Docport {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            import_options: ImportOptions::default(),
            export_options: ExportOptions::default(),
            renderer: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Surface extractor faults instead of falling back.
    pub fn strict(mut self) -> Self {
        self.import_options = self.import_options.strict();
        self
    }

    /// Omit the office conversion note.
    pub fn without_note(mut self) -> Self {
        self.import_options = self.import_options.with_conversion_note(false);
        self
    }

    /// Set import options.
    pub fn with_import_options(mut self, options: ImportOptions) -> Self {
        self.import_options = options;
        self
    }

    /// Set export options.
    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export_options = options;
        self
    }

    /// Set the export title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.export_options = self.export_options.with_title(title);
        self
    }

    /// Set the page renderer for PDF export.
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build the import dispatcher.
    pub fn dispatcher(&self) -> ImportDispatcher {
        ImportDispatcher::new()
            .with_options(self.import_options.clone())
            .with_notifier(self.notifier.clone())
    }

    /// Build the exporter.
    pub fn exporter(&self) -> Exporter {
        let exporter = Exporter::new()
            .with_options(self.export_options.clone())
            .with_notifier(self.notifier.clone());
        match &self.renderer {
            Some(renderer) => exporter.with_renderer(renderer.clone()),
            None => exporter,
        }
    }

    /// Import a file.
    pub fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportOutcome> {
        self.dispatcher().import_path(path)
    }

    /// Import bytes already in memory.
    pub fn import_bytes(&self, name: &str, data: &[u8]) -> Result<ImportOutcome> {
        self.dispatcher()
            .import(&ImportSource::from_bytes(name, data))
    }

    /// Export a tree.
    pub fn export(&self, tree: &DocumentTree, format: ExportFormat) -> Result<ExportPayload> {
        self.exporter().export(tree, format)
    }

    /// Import a file and export it in another format.
    pub fn convert<P: AsRef<Path>>(&self, path: P, format: ExportFormat) -> Result<ExportPayload> {
        let outcome = self.import_file(&path)?;
        let mut exporter = self.exporter();
        if let Some(stem) = path.as_ref().file_stem().and_then(|s| s.to_str()) {
            let options = exporter.options().clone().with_file_stem(stem);
            exporter = exporter.with_options(options);
        }
        exporter.export(&outcome.tree, format)
    }

    /// Convert many files in parallel.
    ///
    /// Results come back in input order; one failure does not stop the rest.
    pub fn convert_batch<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
        format: ExportFormat,
    ) -> Vec<(PathBuf, Result<ExportPayload>)> {
        paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                (path.to_path_buf(), self.convert(path, format))
            })
            .collect()
    }
}

impl Default for Docport {
    fn default() -> Self {
        Self::new()
    }
}

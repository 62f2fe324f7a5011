//! Export pipeline: serializers from the document tree to payloads.
//!
//! Every exporter reads the tree and never mutates it. A failed export
//! leaves the document as it was and reports the error to the caller.

pub mod docx;
mod html;
mod json;
mod markdown;
mod options;
pub mod pdf;
pub mod rtf;
mod text;

pub use docx::{flatten_text, DOCX_CONTENT_TYPE};
pub use html::to_html_document;
pub use json::{to_json, JsonFormat};
pub use markdown::to_markdown;
pub use options::{ExportOptions, Orientation, PageSetup, DEFAULT_FILE_STEM, DEFAULT_TITLE};
pub use pdf::{styled_copy, PageRenderer, PdfRenderJob};
pub use rtf::{encode_rtf, RtfEncoder};
pub use text::to_text;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::model::DocumentTree;
use crate::notify::{LogNotifier, Notifier, Severity};

/// Target format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Plain text with CRLF line endings
    Text,
    /// Standalone HTML document
    Html,
    /// Markdown (text only)
    Markdown,
    /// Rich Text Format
    Rtf,
    /// Flattened text labelled as a word-processing document
    Docx,
    /// PDF through a page renderer
    Pdf,
    /// JSON dump of the tree
    Json,
}

impl ExportFormat {
    /// All formats, in menu order.
    pub const ALL: [ExportFormat; 7] = [
        ExportFormat::Text,
        ExportFormat::Html,
        ExportFormat::Markdown,
        ExportFormat::Rtf,
        ExportFormat::Docx,
        ExportFormat::Pdf,
        ExportFormat::Json,
    ];

    /// Map an extension (with or without the leading dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(ExportFormat::Text),
            "html" | "htm" => Some(ExportFormat::Html),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "rtf" => Some(ExportFormat::Rtf),
            "docx" => Some(ExportFormat::Docx),
            "pdf" => Some(ExportFormat::Pdf),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    /// File extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "md",
            ExportFormat::Rtf => "rtf",
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Json => "json",
        }
    }

    /// MIME type of the payload.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Html => "text/html",
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Rtf => "application/rtf",
            ExportFormat::Docx => DOCX_CONTENT_TYPE,
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| Error::UnsupportedFormat(s.to_string()))
    }
}

/// Serialized document ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    /// File contents
    pub bytes: Vec<u8>,
    /// Suggested file name
    pub filename: String,
    /// MIME type
    pub content_type: String,
}

impl ExportPayload {
    /// Create a payload.
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    /// Contents as text, if they are valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Receives finished exports.
pub trait Downloader: Send + Sync {
    /// Deliver a payload.
    fn deliver(&self, payload: &ExportPayload) -> Result<()>;
}

/// Writes payloads into a directory under their suggested names.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    /// Deliver into `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a payload will be written to.
    pub fn path_for(&self, payload: &ExportPayload) -> PathBuf {
        let name = Path::new(&payload.filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_FILE_STEM.into());
        self.dir.join(name)
    }
}

impl Downloader for DirectoryDownloader {
    fn deliver(&self, payload: &ExportPayload) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(payload);
        std::fs::write(&path, &payload.bytes)?;
        info!("wrote {} ({} bytes)", path.display(), payload.bytes.len());
        Ok(())
    }
}

/// Keeps delivered payloads in memory.
#[derive(Debug, Default)]
pub struct MemoryDownloader {
    payloads: Mutex<Vec<ExportPayload>>,
}

impl MemoryDownloader {
    /// Create an empty downloader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads delivered so far.
    pub fn payloads(&self) -> Vec<ExportPayload> {
        self.payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Downloader for MemoryDownloader {
    fn deliver(&self, payload: &ExportPayload) -> Result<()> {
        self.payloads
            .lock()
            .map_err(|_| Error::Other("downloader lock poisoned".into()))?
            .push(payload.clone());
        Ok(())
    }
}

/// Serializes trees into export payloads.
#[derive(Clone)]
pub struct Exporter {
    options: ExportOptions,
    renderer: Option<Arc<dyn PageRenderer>>,
    notifier: Arc<dyn Notifier>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    /// Create an exporter with default options and no page renderer.
    pub fn new() -> Self {
        Self {
            options: ExportOptions::default(),
            renderer: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Set export options.
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the page renderer used for PDF export.
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Set the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Get the options in use.
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Serialize a tree.
    pub fn export(&self, tree: &DocumentTree, format: ExportFormat) -> Result<ExportPayload> {
        debug!("exporting {} element(s) as {}", tree.element_count(), format);
        let payload = match format {
            ExportFormat::Text => self.text_payload(tree),
            ExportFormat::Html => self.payload(
                format,
                to_html_document(tree, &self.options.title).into_bytes(),
            ),
            ExportFormat::Markdown => self.payload(format, to_markdown(tree).into_bytes()),
            ExportFormat::Rtf => self.payload(format, encode_rtf(tree).into_bytes()),
            ExportFormat::Docx => self.docx_payload(tree),
            ExportFormat::Pdf => self.pdf_payload(tree)?,
            ExportFormat::Json => {
                self.payload(format, to_json(tree, JsonFormat::Pretty)?.into_bytes())
            }
        };
        Ok(payload)
    }

    /// Serialize a tree and hand the payload to a downloader.
    pub fn export_to(
        &self,
        tree: &DocumentTree,
        format: ExportFormat,
        downloader: &dyn Downloader,
    ) -> Result<ExportPayload> {
        let result = self
            .export(tree, format)
            .and_then(|payload| downloader.deliver(&payload).map(|()| payload));
        match result {
            Ok(payload) => {
                self.notifier.notify(
                    &format!("{} exported successfully!", format.extension().to_uppercase()),
                    Severity::Success,
                );
                Ok(payload)
            }
            Err(e) => {
                self.notifier
                    .notify(&format!("Error exporting {}: {}", format, e), Severity::Error);
                Err(e)
            }
        }
    }

    fn payload(&self, format: ExportFormat, bytes: Vec<u8>) -> ExportPayload {
        ExportPayload::new(
            bytes,
            self.options.filename(format.extension()),
            format.content_type(),
        )
    }

    fn text_payload(&self, tree: &DocumentTree) -> ExportPayload {
        self.payload(ExportFormat::Text, to_text(tree).into_bytes())
    }

    fn docx_payload(&self, tree: &DocumentTree) -> ExportPayload {
        let flattened = flatten_text(tree);
        if flattened.is_empty() {
            self.notifier.notify(
                "DOCX export failed. Downloading as text file instead.",
                Severity::Warning,
            );
            return self.text_payload(tree);
        }
        self.payload(ExportFormat::Docx, flattened.into_bytes())
    }

    fn pdf_payload(&self, tree: &DocumentTree) -> Result<ExportPayload> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| Error::Export("no page renderer configured for PDF export".into()))?;
        let job = PdfRenderJob::new(
            tree,
            self.options.title.clone(),
            self.options.page_setup.clone(),
        );
        let bytes = renderer.render(&job)?;
        if bytes.is_empty() {
            return Err(Error::Render("page renderer produced no output".into()));
        }
        Ok(self.payload(ExportFormat::Pdf, bytes))
    }
}

//! Import pipeline: format dispatch, extractors and fallback.
//!
//! Importers are registered by extension in an [`ImporterRegistry`]. The
//! [`ImportDispatcher`] picks one for a source, runs it, degrades to the
//! [`FallbackScanner`] when it declines or fails, and returns the resulting
//! tree together with the state trace it went through.
//!
//! # Example
//!
//! ```no_run
//! use docport::import::{ImportDispatcher, ImportSource};
//!
//! fn main() -> docport::Result<()> {
//!     let dispatcher = ImportDispatcher::new();
//!     let outcome = dispatcher.import(&ImportSource::from_path("notes.rtf")?)?;
//!     println!("{}", outcome.html);
//!     Ok(())
//! }
//! ```

pub mod fallback;
pub mod html;
pub mod markdown;
pub mod office;
mod options;
pub mod pdf;
pub mod rtf;
pub mod session;
pub mod text;

pub use fallback::FallbackScanner;
pub use html::HtmlImporter;
pub use markdown::MarkdownImporter;
pub use office::{OfficeImporter, OfficeScanner};
pub use options::{ErrorMode, FallbackOptions, ImportOptions, OfficeScanOptions};
pub use pdf::{PdfExtractor, PdfImporter, PdfTier};
pub use rtf::RtfImporter;
pub use session::{spawn_import, ApplyResult, ImportTicket, PendingImport, Workspace};
pub use text::TextImporter;

#[cfg(feature = "async")]
pub use session::import_path_async;

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use crate::detect::{detect_format_from_bytes, Format};
use crate::error::{Error, Result};
use crate::model::DocumentTree;
use crate::notify::{LogNotifier, Notifier, Severity};
use crate::sanitize::sanitize_tree;

pub(crate) fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

/// Raw bytes of a file to import, with the name used for dispatch.
#[derive(Debug, Clone)]
pub struct ImportSource {
    /// File name (only the extension matters for dispatch)
    pub name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl ImportSource {
    /// Read a file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::ReadFailure(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read everything from a reader.
    pub fn from_reader<R: Read>(name: impl Into<String>, mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::ReadFailure(e.to_string()))?;
        Ok(Self::from_bytes(name, bytes))
    }

    /// Lowercase extension of the name, or an empty string.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Extractor family used for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Office signature scanner
    Office,
    /// PDF tiers
    Pdf,
    /// RTF rewrite pipeline
    Rtf,
    /// Text formats with no binary extraction
    None,
}

/// A state the dispatcher passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    /// Nothing started
    Idle,
    /// Waiting for the source bytes
    ReadingBytes,
    /// Running an extractor
    Extracting(ExtractorKind),
    /// The extractor produced content
    Success,
    /// The extractor declined or failed
    Declined,
    /// The fallback scanner produced content
    GenericFallback,
    /// The tree was swapped into a workspace
    Applied,
    /// Terminal failure; nothing was changed
    ShowError,
}

/// Which importer produced the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "strategy", content = "tier")]
pub enum Strategy {
    /// Plain text with line breaks
    PlainText,
    /// Sanitized HTML
    Html,
    /// Markdown bridge
    Markdown,
    /// RTF rewrite pipeline
    Rtf,
    /// Office signature scanner
    Office,
    /// PDF extractor and the tier that succeeded
    Pdf(PdfTier),
    /// Generic printable-run recovery
    GenericFallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::PlainText => write!(f, "plain text"),
            Strategy::Html => write!(f, "HTML"),
            Strategy::Markdown => write!(f, "Markdown"),
            Strategy::Rtf => write!(f, "RTF"),
            Strategy::Office => write!(f, "office scan"),
            Strategy::Pdf(tier) => write!(f, "PDF ({})", tier),
            Strategy::GenericFallback => write!(f, "generic fallback"),
        }
    }
}

/// Markup produced by one importer.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// HTML fragment
    pub html: String,
    /// Importer that produced it
    pub strategy: Strategy,
}

impl Extracted {
    /// Create an extraction result.
    pub fn new(html: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            html: html.into(),
            strategy,
        }
    }
}

/// Result of importing one source.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Final markup
    pub html: String,
    /// Tree parsed from the final markup
    pub tree: DocumentTree,
    /// Format chosen for dispatch
    pub format: Format,
    /// Importer that produced the content
    pub strategy: Strategy,
    /// States passed through, in order
    pub states: Vec<ImportState>,
    /// Degradations that happened on the way
    pub warnings: Vec<String>,
}

impl ImportOutcome {
    /// Check whether the fallback scanner produced the content.
    pub fn used_fallback(&self) -> bool {
        self.strategy == Strategy::GenericFallback
    }
}

/// Trait for format importers.
///
/// Implement this trait to add support for a new source format.
pub trait FormatImporter: Send + Sync {
    /// Get the supported file extensions for this importer.
    ///
    /// Extensions should be lowercase without the leading dot (e.g., `["rtf"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this importer.
    fn name(&self) -> &str;

    /// Extractor family reported in the state trace.
    fn extractor_kind(&self) -> ExtractorKind {
        ExtractorKind::None
    }

    /// Convert source bytes to HTML.
    ///
    /// Returning [`Error::Declined`] hands the source to the fallback scanner.
    fn import(&self, extension: &str, data: &[u8], options: &ImportOptions) -> Result<Extracted>;

    /// Check if this importer supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry for format importers.
#[derive(Clone)]
pub struct ImporterRegistry {
    importers: HashMap<String, Arc<dyn FormatImporter>>,
    by_name: HashMap<String, Arc<dyn FormatImporter>>,
}

impl ImporterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            importers: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with every built-in importer.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TextImporter::new()));
        registry.register(Arc::new(HtmlImporter::new()));
        registry.register(Arc::new(MarkdownImporter::new()));
        registry.register(Arc::new(RtfImporter::new()));
        registry.register(Arc::new(OfficeImporter::new()));
        registry.register(Arc::new(PdfImporter::new()));
        registry
    }

    /// Register an importer for all its extensions.
    pub fn register(&mut self, importer: Arc<dyn FormatImporter>) {
        for ext in importer.supported_extensions() {
            self.importers.insert(ext.to_lowercase(), importer.clone());
        }
        self.by_name.insert(importer.name().to_lowercase(), importer);
    }

    /// Get an importer by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn FormatImporter>> {
        self.importers.get(&ext.to_lowercase()).cloned()
    }

    /// Get an importer by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn FormatImporter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Get an importer by extension, failing for unknown extensions.
    pub fn require(&self, ext: &str) -> Result<Arc<dyn FormatImporter>> {
        self.get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(ext.to_string()))
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.importers.contains_key(&ext.to_lowercase())
    }

    /// Get all supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.importers.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Runs the import state machine for one source at a time.
#[derive(Clone)]
pub struct ImportDispatcher {
    registry: ImporterRegistry,
    options: ImportOptions,
    notifier: Arc<dyn Notifier>,
}

impl Default for ImportDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportDispatcher {
    /// Create a dispatcher with the default importers and options.
    pub fn new() -> Self {
        Self {
            registry: ImporterRegistry::with_defaults(),
            options: ImportOptions::default(),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Set import options.
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the importer registry.
    pub fn with_registry(mut self, registry: ImporterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Get the options in use.
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Get the registry in use.
    pub fn registry(&self) -> &ImporterRegistry {
        &self.registry
    }

    /// Read a file and import it.
    ///
    /// A read failure is terminal: the error is reported and returned.
    pub fn import_path<P: AsRef<Path>>(&self, path: P) -> Result<ImportOutcome> {
        match ImportSource::from_path(path) {
            Ok(source) => self.import(&source),
            Err(e) => {
                self.notifier
                    .notify(&format!("Error reading file: {}", e), Severity::Error);
                Err(e)
            }
        }
    }

    /// Pick the format for a source from its extension, sniffing the bytes
    /// when the name has none.
    pub fn resolve_format(&self, source: &ImportSource) -> Format {
        let ext = source.extension();
        if ext.is_empty() {
            if let Some(format) = detect_format_from_bytes(&source.bytes) {
                debug!("no extension on '{}'; sniffed {}", source.name, format);
                return format;
            }
        }
        Format::from_extension(&ext)
    }

    /// Import bytes that are already in memory.
    pub fn import(&self, source: &ImportSource) -> Result<ImportOutcome> {
        let mut states = vec![ImportState::Idle, ImportState::ReadingBytes];
        let mut warnings = Vec::new();

        let format = self.resolve_format(source);
        let ext = format.extension().to_string();
        let importer = match self.registry.get_by_extension(&ext) {
            Some(importer) => importer,
            None => {
                let message = format!(
                    "Unsupported file format '{}'. Importing as plain text.",
                    ext
                );
                self.notifier.notify(&message, Severity::Warning);
                warnings.push(message);
                Arc::new(TextImporter::new())
            }
        };

        states.push(ImportState::Extracting(importer.extractor_kind()));
        self.notifier.notify(
            &format!("Processing {} file...", ext.to_uppercase()),
            Severity::Info,
        );
        debug!("importing '{}' with '{}' importer", source.name, importer.name());

        let attempt = catch_unwind(AssertUnwindSafe(|| {
            importer.import(&ext, &source.bytes, &self.options)
        }))
        .unwrap_or_else(|panic| Err(Error::Catastrophic(panic_message(panic.as_ref()))));

        let extracted = match attempt {
            Ok(extracted) => {
                states.push(ImportState::Success);
                extracted
            }
            Err(e) => {
                if !e.is_declined() && self.options.error_mode == ErrorMode::Strict {
                    states.push(ImportState::ShowError);
                    self.notifier
                        .notify(&format!("Import failed: {}", e), Severity::Error);
                    return Err(e);
                }
                warn!("{} importer gave up: {}", importer.name(), e);
                states.push(ImportState::Declined);
                let extracted = self.run_fallback(&source.bytes, &mut states)?;
                let message = "Using alternative extraction method...".to_string();
                self.notifier.notify(&message, Severity::Warning);
                warnings.push(format!("{}: {}", message, e));
                extracted
            }
        };

        let mut tree = DocumentTree::from_html(&extracted.html);
        if self.options.sanitize_html {
            sanitize_tree(&mut tree);
        }
        let html = tree.to_html();

        let severity = if warnings.is_empty() {
            Severity::Success
        } else {
            Severity::Warning
        };
        self.notifier.notify(
            &format!("{} file imported ({})", ext.to_uppercase(), extracted.strategy),
            severity,
        );

        Ok(ImportOutcome {
            html,
            tree,
            format,
            strategy: extracted.strategy,
            states,
            warnings,
        })
    }

    fn run_fallback(&self, data: &[u8], states: &mut Vec<ImportState>) -> Result<Extracted> {
        let scanner = FallbackScanner::with_options(self.options.fallback);
        match catch_unwind(AssertUnwindSafe(|| scanner.recover(data))) {
            Ok(html) => {
                states.push(ImportState::GenericFallback);
                Ok(Extracted::new(html, Strategy::GenericFallback))
            }
            Err(panic) => {
                states.push(ImportState::ShowError);
                let err = Error::Catastrophic(panic_message(panic.as_ref()));
                self.notifier
                    .notify(&format!("File extraction failed: {}", err), Severity::Error);
                Err(err)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "extractor panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    struct PanickingImporter;

    impl FormatImporter for PanickingImporter {
        fn supported_extensions(&self) -> &[&str] {
            &["boom"]
        }

        fn name(&self) -> &str {
            "boom"
        }

        fn import(&self, _: &str, _: &[u8], _: &ImportOptions) -> Result<Extracted> {
            panic!("scanner index out of range")
        }
    }

    fn registry_with_panic() -> ImporterRegistry {
        let mut registry = ImporterRegistry::with_defaults();
        registry.register(Arc::new(PanickingImporter));
        registry
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ImporterRegistry::with_defaults();
        for ext in ["txt", "html", "htm", "md", "markdown", "rtf", "docx", "doc", "odt", "pages", "pdf"] {
            assert!(registry.supports(ext), "missing {}", ext);
        }
        assert!(registry.get_by_name("pdf").is_some());
        assert!(matches!(
            registry.require("xyz").err(),
            Some(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_source_extension() {
        let source = ImportSource::from_bytes("Report.Final.PDF", Vec::new());
        assert_eq!(source.extension(), "pdf");
        assert_eq!(ImportSource::from_bytes("README", Vec::new()).extension(), "");
    }

    #[test]
    fn test_text_import_trace() {
        let outcome = ImportDispatcher::new()
            .import(&ImportSource::from_bytes("a.txt", "Line1\nLine2"))
            .unwrap();
        assert_eq!(outcome.html, "Line1<br>Line2");
        assert_eq!(outcome.strategy, Strategy::PlainText);
        assert_eq!(
            outcome.states,
            vec![
                ImportState::Idle,
                ImportState::ReadingBytes,
                ImportState::Extracting(ExtractorKind::None),
                ImportState::Success,
            ]
        );
    }

    #[test]
    fn test_unknown_extension_degrades_to_text() {
        let notifier = Arc::new(RecordingNotifier::new());
        let outcome = ImportDispatcher::new()
            .with_notifier(notifier.clone())
            .import(&ImportSource::from_bytes("notes.xyz", "a < b"))
            .unwrap();
        assert_eq!(outcome.html, "a &lt; b");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(notifier.severities().contains(&Severity::Warning));
    }

    #[test]
    fn test_declined_office_uses_fallback() {
        let outcome = ImportDispatcher::new()
            .import(&ImportSource::from_bytes("old.doc", &b"\x00\x01Readable text here\x00"[..]))
            .unwrap();
        assert!(outcome.used_fallback());
        assert_eq!(outcome.html, "<p>Readable text here</p>");
        assert_eq!(
            &outcome.states[2..],
            &[
                ImportState::Extracting(ExtractorKind::Office),
                ImportState::Declined,
                ImportState::GenericFallback,
            ]
        );
    }

    #[test]
    fn test_panic_is_caught_and_degraded() {
        let dispatcher = ImportDispatcher::new().with_registry(registry_with_panic());
        let outcome = dispatcher
            .import(&ImportSource::from_bytes("x.boom", &b"\x00survivor text\x00"[..]))
            .unwrap();
        assert!(outcome.used_fallback());
        assert!(outcome.html.contains("survivor text"));
    }

    #[test]
    fn test_strict_mode_surfaces_catastrophic() {
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = ImportDispatcher::new()
            .with_registry(registry_with_panic())
            .with_options(ImportOptions::new().strict())
            .with_notifier(notifier.clone());
        let err = dispatcher
            .import(&ImportSource::from_bytes("x.boom", "data"))
            .unwrap_err();
        assert!(matches!(err, Error::Catastrophic(ref m) if m.contains("out of range")));
        assert_eq!(notifier.severities().last(), Some(&Severity::Error));
    }

    #[test]
    fn test_strict_mode_still_falls_back_on_decline() {
        let dispatcher = ImportDispatcher::new().with_options(ImportOptions::new().strict());
        let outcome = dispatcher
            .import(&ImportSource::from_bytes("a.pages", &b"\x00some page text\x00"[..]))
            .unwrap();
        assert!(outcome.used_fallback());
    }

    #[test]
    fn test_sniffs_format_without_extension() {
        let outcome = ImportDispatcher::new()
            .import(&ImportSource::from_bytes("clipboard", r"{\rtf1\ansi Hi\par}"))
            .unwrap();
        assert_eq!(outcome.format, Format::Rtf);
        assert_eq!(outcome.strategy, Strategy::Rtf);
    }

    #[test]
    fn test_html_import_is_sanitized() {
        let outcome = ImportDispatcher::new()
            .import(&ImportSource::from_bytes("page.html", "<script>alert(1)</script><p>hi</p>"))
            .unwrap();
        assert_eq!(outcome.html, "<p>hi</p>");
    }

    #[test]
    fn test_read_failure_is_terminal() {
        let notifier = Arc::new(RecordingNotifier::new());
        let err = ImportDispatcher::new()
            .with_notifier(notifier.clone())
            .import_path("/definitely/not/here.txt")
            .unwrap_err();
        assert!(matches!(err, Error::ReadFailure(_)));
        assert_eq!(notifier.severities(), vec![Severity::Error]);
    }
}

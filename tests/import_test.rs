//! Integration tests for the import pipeline.

use std::sync::Arc;

use docport::error::{Error, Result};
use docport::import::{
    spawn_import, ApplyResult, ErrorMode, Extracted, ExtractorKind, FormatImporter,
    ImportDispatcher, ImportOptions, ImportSource, ImportState, ImporterRegistry, PdfTier,
    Strategy, Workspace,
};
use docport::notify::{NullNotifier, RecordingNotifier, Severity};
use docport::Format;

/// Importer that always reports a fixed fault.
struct BrokenImporter;

impl FormatImporter for BrokenImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["rtf"]
    }

    fn name(&self) -> &str {
        "broken-rtf"
    }

    fn extractor_kind(&self) -> ExtractorKind {
        ExtractorKind::Rtf
    }

    fn import(&self, _ext: &str, _data: &[u8], _options: &ImportOptions) -> Result<Extracted> {
        Err(Error::Decode("bad escape".into()))
    }
}

fn quiet() -> ImportDispatcher {
    ImportDispatcher::new().with_notifier(Arc::new(NullNotifier))
}

fn docx_bytes(xml: &str) -> Vec<u8> {
    let mut data = b"PK\x03\x04\x14\x00\x00\x00\x00\x00".to_vec();
    data.extend_from_slice(b"word/document.xml");
    data.extend(std::iter::repeat(0u8).take(200));
    data.extend_from_slice(xml.as_bytes());
    data.extend_from_slice(b"PK\x01\x02");
    data
}

#[test]
fn test_plain_text_is_not_wrapped() {
    let outcome = quiet()
        .import(&ImportSource::from_bytes("note.txt", "Line1\nLine2"))
        .unwrap();
    assert_eq!(outcome.html, "Line1<br>Line2");
    assert_eq!(outcome.tree.plain_text(), "Line1\nLine2");
    assert!(!outcome.html.contains("<p>"));
}

#[test]
fn test_html_script_removed() {
    let outcome = quiet()
        .import(&ImportSource::from_bytes(
            "page.htm",
            "<script>alert(1)</script><p>hi</p>",
        ))
        .unwrap();
    assert_eq!(outcome.html, "<p>hi</p>");
    assert_eq!(outcome.strategy, Strategy::Html);
}

#[test]
fn test_markdown_headings() {
    let outcome = quiet()
        .import(&ImportSource::from_bytes("n.markdown", "# One\n\n###### Six"))
        .unwrap();
    assert!(outcome.html.contains("<h1>One</h1>"));
    assert!(outcome.html.contains("<h6>Six</h6>"));
}

#[test]
fn test_rtf_import() {
    let rtf = "{\\rtf1\\ansi{\\fonttbl\\f0\\fswiss Helvetica;}\\pard\\b Bold\\b0 \\par Plain caf\\'e9}";
    let outcome = quiet()
        .import(&ImportSource::from_bytes("doc.rtf", rtf))
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::Rtf);
    assert_eq!(outcome.tree.plain_text(), "Bold\nPlain café");
}

#[test]
fn test_docx_extraction_with_note() {
    let data = docx_bytes(
        "<w:body><w:p><w:pPr><w:pStyle w:val=\"Heading2\"/></w:pPr><w:r><w:t>Agenda</w:t></w:r></w:p>\
         <w:p><w:r><w:t>Review budget</w:t></w:r></w:p></w:body>",
    );
    let outcome = quiet()
        .import(&ImportSource::from_bytes("minutes.docx", data))
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::Office);
    assert!(outcome.html.starts_with("<h2"));
    assert!(outcome.html.contains("Agenda"));
    assert!(outcome.html.contains("<p>Review budget</p>"));
    assert!(outcome.html.contains("simplified during import"));
}

#[test]
fn test_docx_without_note() {
    let data = docx_bytes("<w:p><w:r><w:t>Only text</w:t></w:r></w:p>");
    let outcome = quiet()
        .with_options(ImportOptions::new().with_conversion_note(false))
        .import(&ImportSource::from_bytes("a.docx", data))
        .unwrap();
    assert_eq!(outcome.html, "<p>Only text</p>");
}

#[test]
fn test_docx_without_signature_falls_back() {
    let mut data = b"PK\x03\x04".to_vec();
    data.extend_from_slice(b"\x00\x00some readable leftovers\x00\x00");
    let outcome = quiet()
        .import(&ImportSource::from_bytes("broken.docx", data))
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::GenericFallback);
    assert!(outcome.states.contains(&ImportState::Declined));
    assert!(outcome.html.contains("some readable leftovers"));
}

#[test]
fn test_pdf_text_show() {
    let data = b"%PDF-1.4\n1 0 obj\nstream\nBT /F1 12 Tf 72 712 Td (Hello) Tj ET\nendstream\n";
    let outcome = quiet()
        .import(&ImportSource::from_bytes("report.pdf", &data[..]))
        .unwrap();
    assert!(matches!(outcome.strategy, Strategy::Pdf(_)));
    assert!(outcome.tree.plain_text().contains("Hello"));
    assert_eq!(
        outcome.states[2],
        ImportState::Extracting(ExtractorKind::Pdf)
    );
}

#[test]
fn test_pdf_structured_tier() {
    let data = b"%PDF-1.7\n/Heading\n/Text (Results)>\n/Paragraph\n/Text (All good)>\n";
    let outcome = quiet()
        .import(&ImportSource::from_bytes("r.pdf", &data[..]))
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::Pdf(PdfTier::Structured));
    assert_eq!(outcome.html, "<h2>Results</h2><p>All good</p>");
}

#[test]
fn test_pdf_with_procset_resources() {
    let data = b"%PDF-1.4\n3 0 obj\n<< /Type /Page /Resources << /ProcSet [/PDF /Text] /Font << /F1 5 0 R >> >> /Contents 4 0 R >>\nendobj\n4 0 obj\n<< /Length 44 >>\nstream\nBT /F1 12 Tf 72 712 Td (Hello World) Tj ET\nendstream\nendobj\n";
    let outcome = quiet()
        .import(&ImportSource::from_bytes("page.pdf", &data[..]))
        .unwrap();
    assert_ne!(outcome.strategy, Strategy::Pdf(PdfTier::Structured));
    assert!(outcome.tree.plain_text().contains("Hello World"));
}

#[test]
fn test_binary_garbage_never_empty() {
    let data: Vec<u8> = (0u8..=255).cycle().take(4096).filter(|b| *b < 0x20).collect();
    let outcome = quiet()
        .import(&ImportSource::from_bytes("x.pdf", data))
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::GenericFallback);
    assert!(outcome.html.contains("Could not extract meaningful content"));
}

#[test]
fn test_custom_registry_lenient_and_strict() {
    let mut registry = ImporterRegistry::with_defaults();
    registry.register(Arc::new(BrokenImporter));
    assert_eq!(registry.get_by_extension("RTF").unwrap().name(), "broken-rtf");

    let source = ImportSource::from_bytes("a.rtf", &b"\x00recoverable words\x00"[..]);
    let outcome = quiet()
        .with_registry(registry.clone())
        .import(&source)
        .unwrap();
    assert!(outcome.used_fallback());

    let notifier = Arc::new(RecordingNotifier::new());
    let err = ImportDispatcher::new()
        .with_registry(registry)
        .with_options(ImportOptions::new().with_error_mode(ErrorMode::Strict))
        .with_notifier(notifier.clone())
        .import(&source)
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert_eq!(notifier.severities().first(), Some(&Severity::Info));
    assert_eq!(notifier.severities().last(), Some(&Severity::Error));
}

#[test]
fn test_import_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.md");
    std::fs::write(&path, "- milk\n- eggs").unwrap();

    let outcome = quiet().import_path(&path).unwrap();
    assert_eq!(outcome.format, Format::Markdown);
    assert!(outcome.html.contains("<li>milk</li>"));
}

#[test]
fn test_import_from_reader() {
    let source = ImportSource::from_reader("r.txt", &b"from a reader"[..]).unwrap();
    assert_eq!(source.extension(), "txt");
    let outcome = quiet().import(&source).unwrap();
    assert_eq!(outcome.html, "from a reader");
}

#[test]
fn test_deferred_import_applies_once() {
    let mut workspace = Workspace::new();
    let ticket = workspace.ticket();
    let pending = spawn_import(
        ImportSource::from_bytes("a.txt", "imported"),
        Arc::new(quiet()),
    );
    let outcome = pending.wait().unwrap();

    match workspace.apply(ticket, outcome.clone()) {
        ApplyResult::Applied { states } => {
            assert_eq!(states.first(), Some(&ImportState::Idle));
            assert_eq!(states.last(), Some(&ImportState::Applied));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!workspace.apply(ticket, outcome).is_applied());
    assert_eq!(workspace.tree().plain_text(), "imported");
}

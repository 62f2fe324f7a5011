//! Integration tests for the export pipeline.

use std::sync::{Arc, Mutex};

use docport::error::Result;
use docport::export::{
    flatten_text, DirectoryDownloader, Downloader, ExportFormat, ExportOptions, Exporter,
    MemoryDownloader, Orientation, PageRenderer, PageSetup, PdfRenderJob, DOCX_CONTENT_TYPE,
};
use docport::notify::NullNotifier;
use docport::DocumentTree;

/// Renderer that remembers the last job it saw.
#[derive(Default)]
struct CapturingRenderer {
    last_html: Mutex<Option<String>>,
}

impl PageRenderer for CapturingRenderer {
    fn render(&self, job: &PdfRenderJob) -> Result<Vec<u8>> {
        *self.last_html.lock().unwrap() = Some(job.html());
        Ok(b"%PDF-1.4\n%%EOF".to_vec())
    }
}

fn note() -> DocumentTree {
    DocumentTree::from_html(
        "<h1>Shopping</h1><p>Remember <b>all</b> of it.</p>\
         <ol><li>bread</li><li>jam</li></ol><ul><li>cash</li></ul>",
    )
}

fn exporter() -> Exporter {
    Exporter::new().with_notifier(Arc::new(NullNotifier))
}

#[test]
fn test_text_export_crlf() {
    let payload = exporter().export(&note(), ExportFormat::Text).unwrap();
    let text = payload.as_text().unwrap();
    assert!(text.starts_with("Shopping\r\nRemember all of it.\r\n"));
    assert!(!text.replace("\r\n", "").contains('\n'));
}

#[test]
fn test_html_document() {
    let payload = exporter().export(&note(), ExportFormat::Html).unwrap();
    let html = payload.as_text().unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Exported Note</title>"));
    assert!(html.contains("<h1>Shopping</h1>"));
    assert_eq!(payload.content_type, "text/html");
}

#[test]
fn test_markdown_is_text_only() {
    let payload = exporter().export(&note(), ExportFormat::Markdown).unwrap();
    let md = payload.as_text().unwrap();
    assert!(md.starts_with("Shopping\nRemember all of it."));
    assert!(!md.contains('#'));
    assert!(!md.contains("**"));
    assert_eq!(payload.filename, "note.md");
}

#[test]
fn test_rtf_export() {
    let payload = exporter().export(&note(), ExportFormat::Rtf).unwrap();
    let rtf = payload.as_text().unwrap();
    assert!(rtf.starts_with("{\\rtf1\\ansi\\ansicpg1252"));
    assert!(rtf.contains("\\fs52\\b "));
    assert!(rtf.contains("\\b all\\b0 "));
    assert!(rtf.contains("1. bread"));
    assert!(rtf.contains("2. jam"));
    assert!(rtf.contains("\\bullet cash"));
    assert!(rtf.ends_with('}'));
    assert_eq!(payload.content_type, "application/rtf");
}

#[test]
fn test_docx_flattened() {
    let payload = exporter().export(&note(), ExportFormat::Docx).unwrap();
    assert_eq!(payload.filename, "note.docx");
    assert_eq!(payload.content_type, DOCX_CONTENT_TYPE);
    assert_eq!(
        payload.as_text().unwrap(),
        "Shopping\nRemember all of it.\n1. bread\n2. jam\n\u{2022} cash\n"
    );
    assert_eq!(payload.as_text().unwrap(), flatten_text(&note()));
}

#[test]
fn test_json_export() {
    let payload = exporter().export(&note(), ExportFormat::Json).unwrap();
    let back: DocumentTree = serde_json::from_slice(&payload.bytes).unwrap();
    assert_eq!(back, note());
}

#[test]
fn test_pdf_job_contents() {
    let renderer = Arc::new(CapturingRenderer::default());
    let setup = PageSetup::default().with_orientation(Orientation::Landscape);
    let payload = exporter()
        .with_options(
            ExportOptions::new()
                .with_title("Groceries")
                .with_file_stem("list")
                .with_page_setup(setup),
        )
        .with_renderer(renderer.clone())
        .export(&note(), ExportFormat::Pdf)
        .unwrap();

    assert_eq!(payload.filename, "list.pdf");
    assert!(payload.bytes.starts_with(b"%PDF-"));
    let html = renderer.last_html.lock().unwrap().clone().unwrap();
    assert!(html.contains(">Groceries</h2>"));
    assert!(html.contains("Exported on "));
    assert!(html.contains("margin-left: 20px"));
}

#[test]
fn test_export_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = DirectoryDownloader::new(dir.path());
    let payload = exporter()
        .export_to(&note(), ExportFormat::Text, &downloader)
        .unwrap();
    let written = std::fs::read(dir.path().join(&payload.filename)).unwrap();
    assert_eq!(written, payload.bytes);
}

#[test]
fn test_every_format_but_pdf_without_renderer() {
    let downloader = MemoryDownloader::new();
    for format in ExportFormat::ALL {
        let result = exporter().export_to(&note(), format, &downloader);
        assert_eq!(result.is_ok(), format != ExportFormat::Pdf, "{}", format);
    }
    assert_eq!(downloader.payloads().len(), ExportFormat::ALL.len() - 1);
}

#[test]
fn test_downloader_trait_object() {
    let downloader: Box<dyn Downloader> = Box::new(MemoryDownloader::new());
    let payload = exporter().export(&note(), ExportFormat::Html).unwrap();
    assert!(downloader.deliver(&payload).is_ok());
}

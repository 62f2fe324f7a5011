//! Benchmarks for import and export throughput.
//!
//! Run with: cargo bench
//!
//! Inputs are synthetic: a PDF with text objects, a zip-like office blob,
//! and an HTML note with lists and styled runs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use docport::import::fallback::FallbackScanner;
use docport::import::pdf::PdfExtractor;
use docport::import::rtf::import_rtf;
use docport::{encode_rtf, DocumentTree, ImportDispatcher, ImportSource, NullNotifier};
use std::sync::Arc;

/// Creates a synthetic PDF with one text object per page.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut content = String::from("%PDF-1.4\n");
    for i in 0..page_count {
        let text = format!(
            "BT /F1 12 Tf 100 700 Td (Page {} - benchmark content for text recovery.) Tj ET",
            i + 1
        );
        content.push_str(&format!(
            "{} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
            i + 3,
            text.len(),
            text
        ));
    }
    content.push_str("%%EOF\n");
    content.into_bytes()
}

/// Creates an office-like blob with binary noise between readable runs.
fn create_office_blob(paragraphs: usize) -> Vec<u8> {
    let mut data = b"PK\x03\x04\x14\x00\x00\x00".to_vec();
    data.extend_from_slice(b"word/document.xml");
    data.extend(std::iter::repeat(0u8).take(200));
    for i in 0..paragraphs {
        data.extend_from_slice(
            format!("<w:p><w:r><w:t>Paragraph number {} of the body</w:t></w:r></w:p>", i)
                .as_bytes(),
        );
        data.extend_from_slice(&[0x00, 0x9c, 0x01, 0xff]);
    }
    data
}

fn create_note(items: usize) -> DocumentTree {
    let mut html = String::from("<h1>Benchmark</h1><p>Some <b>bold</b> and <i>italic</i> text.</p><ol>");
    for i in 0..items {
        html.push_str(&format!("<li style=\"color: #336699\">item {}</li>", i));
    }
    html.push_str("</ol><blockquote>Quoted café</blockquote>");
    DocumentTree::from_html(&html)
}

fn bench_pdf_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdf_extraction");
    for page_count in [1, 10, 50].iter() {
        let data = create_test_pdf(*page_count);
        group.bench_function(format!("{}_pages", page_count), |b| {
            let extractor = PdfExtractor::new();
            b.iter(|| extractor.extract(black_box(&data)));
        });
    }
    group.finish();
}

fn bench_fallback_scan(c: &mut Criterion) {
    let data = create_office_blob(200);
    c.bench_function("fallback_scan", |b| {
        let scanner = FallbackScanner::new();
        b.iter(|| scanner.recover(black_box(&data)));
    });
}

fn bench_office_import(c: &mut Criterion) {
    let source = ImportSource::from_bytes("bench.docx", create_office_blob(200));
    let dispatcher = ImportDispatcher::new().with_notifier(Arc::new(NullNotifier));
    c.bench_function("office_import", |b| {
        b.iter(|| dispatcher.import(black_box(&source)));
    });
}

fn bench_rtf(c: &mut Criterion) {
    let tree = create_note(100);
    let rtf = encode_rtf(&tree);

    c.bench_function("rtf_encode", |b| {
        b.iter(|| encode_rtf(black_box(&tree)));
    });
    c.bench_function("rtf_import", |b| {
        b.iter(|| import_rtf(black_box(rtf.as_bytes())));
    });
}

criterion_group!(
    benches,
    bench_pdf_extraction,
    bench_fallback_scan,
    bench_office_import,
    bench_rtf,
);
criterion_main!(benches);
